//! docxmerge: merge a directory of .docx files into one document
//!
//! This library rebuilds the body of each source document inside a single
//! destination document, copying paragraphs, runs, tables, hyperlinks and
//! images through the destination's own vocabulary, then renders the result
//! to PDF.

pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod extract;
pub mod markup;
pub mod merge;
pub mod render;

/// PDF converter options
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConverterKind {
    /// LibreOffice if installed, otherwise the HTML route
    Auto,
    /// LibreOffice headless only
    Soffice,
    /// Built-in HTML conversion plus wkhtmltopdf only
    Html,
}

/// Summary output options
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

// Re-export commonly used types
pub use config::MergeConfig;
pub use document::{load_document, Document, LoadOptions};
pub use error::{CopyError, DocumentError};
pub use merge::{CopyReport, MergeOptions, MergeOutcome, Merger};
