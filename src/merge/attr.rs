//! Copy-if-present attribute copying and the skip report
//!
//! Every property copy in the engine goes through [`AttributeCopier::copy`]:
//! unset source values are left alone, readable values are applied, and
//! unreadable ones are recorded in the [`CopyReport`] without touching the
//! destination.

use serde::Serialize;
use std::fmt;

use crate::error::CopyError;

/// Where in the document a skip happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Body,
    Paragraph,
    Run,
    Hyperlink,
    Image,
    Table,
    Cell,
    Metadata,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Body => "body",
            Scope::Paragraph => "paragraph",
            Scope::Run => "run",
            Scope::Hyperlink => "hyperlink",
            Scope::Image => "image",
            Scope::Table => "table",
            Scope::Cell => "cell",
            Scope::Metadata => "metadata",
        };
        f.write_str(name)
    }
}

/// One recorded, non-fatal skip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub source: String,
    pub scope: Scope,
    pub item: String,
    pub reason: String,
}

impl fmt::Display for SkippedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}: {}", self.source, self.scope, self.item, self.reason)
    }
}

/// Everything the engine skipped during one merge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    #[serde(skip)]
    current_source: String,
    skipped: Vec<SkippedItem>,
}

impl CopyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute subsequent records to `source`.
    pub fn begin_source(&mut self, source: impl Into<String>) {
        self.current_source = source.into();
    }

    pub fn record(&mut self, scope: Scope, item: impl Into<String>, error: &CopyError) {
        let entry = SkippedItem {
            source: self.current_source.clone(),
            scope,
            item: item.into(),
            reason: error.to_string(),
        };
        log::debug!("skipped {entry}");
        self.skipped.push(entry);
    }

    pub fn skipped(&self) -> &[SkippedItem] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn for_source<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a SkippedItem> {
        self.skipped.iter().filter(move |s| s.source == source)
    }

    pub fn count(&self, scope: Scope) -> usize {
        self.skipped.iter().filter(|s| s.scope == scope).count()
    }
}

/// Applies optional source values to a destination, isolating failures.
pub struct AttributeCopier<'r> {
    scope: Scope,
    report: &'r mut CopyReport,
}

impl<'r> AttributeCopier<'r> {
    pub fn new(scope: Scope, report: &'r mut CopyReport) -> Self {
        AttributeCopier { scope, report }
    }

    /// Run `apply` when `value` is set; record the failure when it is
    /// unreadable. Returns whether anything was applied.
    pub fn copy<T>(
        &mut self,
        item: &str,
        value: Result<Option<T>, CopyError>,
        apply: impl FnOnce(T),
    ) -> bool {
        match value {
            Ok(Some(value)) => {
                apply(value);
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.report.record(self.scope, item, &e);
                false
            }
        }
    }

    pub fn skip(&mut self, item: &str, error: &CopyError) {
        self.report.record(self.scope, item, error);
    }
}
