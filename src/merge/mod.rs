//! The content-model copy engine
//!
//! Copies the body of one source document into a destination document,
//! element by element, rebuilding every paragraph, run and table through the
//! destination's own vocabulary. Nothing in here fails a merge: problems with
//! individual attributes, runs or nodes are recorded in a [`CopyReport`] and
//! the copy carries on.

pub mod attr;
pub mod body;
pub mod merger;
pub mod metadata;
pub mod paragraph;
pub mod registry;
pub mod run;
pub mod table;

pub use attr::{AttributeCopier, CopyReport, Scope, SkippedItem};
pub use merger::{MergeOptions, MergeOutcome, MergedSource, Merger};
pub use registry::AnchorRegistry;

use crate::document::Document;
use crate::error::CopyError;
use crate::markup::{element, Element};

/// Everything a copier needs while copying one source.
pub struct CopyContext<'a> {
    pub source: &'a Document,
    pub dest: &'a mut Document,
    pub registry: &'a mut AnchorRegistry,
    pub report: &'a mut CopyReport,
}

impl<'a> CopyContext<'a> {
    pub fn new(
        source: &'a Document,
        dest: &'a mut Document,
        registry: &'a mut AnchorRegistry,
        report: &'a mut CopyReport,
    ) -> Self {
        CopyContext {
            source,
            dest,
            registry,
            report,
        }
    }

    pub fn attributes(&mut self, scope: Scope) -> AttributeCopier<'_> {
        AttributeCopier::new(scope, self.report)
    }

    pub fn skip(&mut self, scope: Scope, item: impl Into<String>, error: &CopyError) {
        self.report.record(scope, item, error);
    }

    /// Deep copy of a source subtree that will be inserted verbatim, with its
    /// namespace prefixes declared in the destination. Prefixes the
    /// destination binds to another URI are renamed in the copy.
    pub fn clone_opaque(&mut self, subtree: &Element) -> Element {
        let renames = self.dest.adopt_namespaces(subtree, self.source);
        let mut copy = subtree.deep_clone();
        if !renames.is_empty() {
            copy.rename_prefixes(&renames);
        }
        copy
    }
}

/// A paragraph holding nothing but a hard page break.
pub fn page_break() -> Element {
    element("w", "p").with_child(
        element("w", "r").with_child(element("w", "br").with_attr("w:type", "page")),
    )
}
