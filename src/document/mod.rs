//! Document loading, saving and read-only views
//!
//! This module provides the package-level representation of a Microsoft Word
//! (.docx) document: the zip package, its relationship set and metadata
//! record, and typed views over the body tree.

pub mod loader;
pub mod models;
pub mod package;
pub(crate) mod parsing;
pub mod properties;
pub mod query;
pub mod relationships;
pub mod view;

pub use loader::{load_document, LoadOptions};
pub use models::*;
pub use parsing::ImageInfo;
pub use properties::{CoreField, CoreProperties};
pub use query::*;
pub use relationships::{Relationship, Relationships};
pub use view::*;
