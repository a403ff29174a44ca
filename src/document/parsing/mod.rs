//! Document parsing utilities
//!
//! Readers that turn raw property markup into typed values, plus the table
//! grid and drawing helpers shared by the copiers.

pub(crate) mod drawing;
pub(crate) mod formatting;
pub(crate) mod table;

pub use drawing::ImageInfo;
