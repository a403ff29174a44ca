//! Core document properties (`docProps/core.xml`)

use serde::Serialize;

use super::models::Document;
use crate::error::CopyError;
use crate::markup::{element, ns, Element};

pub const DEFAULT_CORE_PART: &str = "docProps/core.xml";
pub const CORE_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.core-properties+xml";

/// The metadata fields carried over from sources into the merged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoreField {
    Title,
    Subject,
    Author,
    Keywords,
    Comments,
}

impl CoreField {
    pub const ALL: [CoreField; 5] = [
        CoreField::Title,
        CoreField::Subject,
        CoreField::Author,
        CoreField::Keywords,
        CoreField::Comments,
    ];

    pub fn element_name(self) -> &'static str {
        match self {
            CoreField::Title => "dc:title",
            CoreField::Subject => "dc:subject",
            CoreField::Author => "dc:creator",
            CoreField::Keywords => "cp:keywords",
            CoreField::Comments => "dc:description",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CoreField::Title => "title",
            CoreField::Subject => "subject",
            CoreField::Author => "author",
            CoreField::Keywords => "keywords",
            CoreField::Comments => "comments",
        }
    }
}

/// Read one field. `Ok(None)` means the field is absent or empty.
pub fn read_field(core: Option<&Element>, field: CoreField) -> Result<Option<String>, CopyError> {
    let core = core.ok_or_else(|| CopyError::MissingPart(DEFAULT_CORE_PART.to_string()))?;
    Ok(core
        .child(field.element_name())
        .map(Element::text)
        .filter(|text| !text.is_empty()))
}

/// Set one field, or remove it when `value` is `None`.
pub fn write_field(core: &mut Element, field: CoreField, value: Option<&str>) {
    let name = field.element_name();
    match value {
        Some(value) => {
            if core.child(name).is_none() {
                core.push(Element::new(name));
            }
            if let Some(slot) = core.child_mut(name) {
                slot.set_text(value);
            }
        }
        None => {
            core.remove_children(name);
        }
    }
}

/// An empty `cp:coreProperties` root with the usual namespace bindings.
pub fn blank_core() -> Element {
    element("cp", "coreProperties")
        .with_attr("xmlns:cp", ns::CP)
        .with_attr("xmlns:dc", ns::DC)
        .with_attr("xmlns:dcterms", ns::DCTERMS)
        .with_attr("xmlns:xsi", ns::XSI)
}

/// Snapshot of a document's metadata, used for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub comments: Option<String>,
}

impl CoreProperties {
    pub fn of(document: &Document) -> Self {
        let core = document.core_properties();
        let field = |f| read_field(core, f).ok().flatten();
        CoreProperties {
            title: field(CoreField::Title),
            subject: field(CoreField::Subject),
            author: field(CoreField::Author),
            keywords: field(CoreField::Keywords),
            comments: field(CoreField::Comments),
        }
    }
}

impl Document {
    pub fn core_field(&self, field: CoreField) -> Result<Option<String>, CopyError> {
        read_field(self.core_properties(), field)
    }

    pub fn set_core_field(&mut self, field: CoreField, value: Option<&str>) {
        write_field(self.core_mut(), field, value);
    }
}
