//! Error types
//!
//! Two layers of failure exist in a merge. [`DocumentError`] covers loading
//! and saving whole packages: a source that fails here is left out of the
//! merge entirely. [`CopyError`] covers a single attribute, run or node inside
//! an otherwise healthy document; it is recorded and the copy carries on.

use thiserror::Error;

/// Failure to load, parse or persist a document package.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("part {0} is not valid UTF-8")]
    Encoding(String),

    #[error("unbalanced markup in part {0}")]
    Unbalanced(String),

    #[error("missing package part: {0}")]
    MissingPart(String),

    #[error("part {name} is {size} bytes, above the {limit} byte limit")]
    PartTooLarge { name: String, size: u64, limit: u64 },

    #[error("not a WordprocessingML document: {0}")]
    InvalidFormat(String),

    #[error("failed to build the blank destination template: {0}")]
    Template(String),
}

impl DocumentError {
    /// Whether resaving the file through an office suite may make it loadable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DocumentError::PartTooLarge { .. }
                | DocumentError::Xml(_)
                | DocumentError::XmlAttribute(_)
                | DocumentError::Unbalanced(_)
        )
    }
}

/// Non-fatal failure while copying one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    #[error("malformed value {value:?} for {attribute}")]
    Malformed {
        attribute: &'static str,
        value: String,
    },

    #[error("relationship {0} does not resolve")]
    MissingRelationship(String),

    #[error("relationship target {0} is missing from the package")]
    MissingPart(String),

    #[error("unrecognized image data: {0}")]
    UnsupportedImage(String),

    #[error("style {0} is not defined in the destination")]
    UnknownStyle(String),

    #[error("unsupported node {0}")]
    Unsupported(String),
}

impl CopyError {
    pub(crate) fn malformed(attribute: &'static str, value: impl Into<String>) -> Self {
        CopyError::Malformed {
            attribute,
            value: value.into(),
        }
    }
}
