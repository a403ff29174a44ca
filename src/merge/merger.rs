//! Merge session
//!
//! A [`Merger`] owns the destination document, the bookmark registry and the
//! skip report for one merge. Sources are appended one at a time; `finish`
//! resolves synthesized bookmarks and optionally prepends a contents page.

use regex::Regex;
use serde::Serialize;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use super::attr::CopyReport;
use super::body::copy_body;
use super::metadata::copy_metadata;
use super::registry::AnchorRegistry;
use super::run::text_element;
use super::{page_break, CopyContext};
use crate::document::Document;
use crate::error::DocumentError;
use crate::markup::{element, Element, Node};

/// Marker id and name given to synthesized bookmarks until `finish`
/// assigns real ones.
const PENDING_PREFIX: &str = "pending-";

static UNSAFE_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Wrap the first paragraph of each source in a `src_<name>` bookmark.
    pub source_bookmarks: bool,
    /// Prepend a page of internal links to each source. Implies bookmarks.
    pub contents_page: bool,
}

/// One source that made it into the merged document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedSource {
    pub name: String,
    pub blocks: usize,
    pub anchor: Option<String>,
}

/// Result of a finished merge.
#[derive(Debug)]
pub struct MergeOutcome {
    pub document: Document,
    pub report: CopyReport,
    pub sources: Vec<MergedSource>,
}

pub struct Merger {
    dest: Document,
    registry: AnchorRegistry,
    report: CopyReport,
    options: MergeOptions,
    sources: Vec<MergedSource>,
    /// Pending marker, source index and wanted name of each synthesized
    /// bookmark, in source order.
    pending_anchors: Vec<(String, usize, String)>,
}

impl Merger {
    /// Start a merge into a blank destination document.
    pub fn new(options: MergeOptions) -> Result<Self, DocumentError> {
        Ok(Self::with_destination(Document::blank()?, options))
    }

    pub fn with_destination(dest: Document, options: MergeOptions) -> Self {
        Merger {
            dest,
            registry: AnchorRegistry::new(),
            report: CopyReport::new(),
            options,
            sources: Vec::new(),
            pending_anchors: Vec::new(),
        }
    }

    pub fn report(&self) -> &CopyReport {
        &self.report
    }

    pub fn merged_count(&self) -> usize {
        self.sources.len()
    }

    /// Append one source. Never fails: anything that cannot be copied is
    /// recorded in the report.
    pub fn append(&mut self, source: &Document) {
        self.report.begin_source(source.title.as_str());
        if !self.sources.is_empty() {
            self.dest.append_block(page_break());
        }

        let start = self.body_len();
        let blocks = {
            let mut ctx = CopyContext::new(
                source,
                &mut self.dest,
                &mut self.registry,
                &mut self.report,
            );
            copy_body(&mut ctx)
        };
        copy_metadata(source, &mut self.dest, &mut self.report);

        if self.options.source_bookmarks || self.options.contents_page {
            self.anchor_source(&source.title, start, blocks);
        }

        log::info!("merged {} ({blocks} blocks)", source.title);
        self.sources.push(MergedSource {
            name: source.title.clone(),
            blocks,
            anchor: None,
        });
    }

    /// Resolve synthesized bookmarks, add the contents page if requested and
    /// hand back the destination.
    pub fn finish(mut self) -> MergeOutcome {
        self.assign_pending_anchors();
        if self.options.contents_page && self.sources.iter().any(|s| s.anchor.is_some()) {
            let page = self.contents_page();
            self.dest.prepend_blocks(page);
        }
        MergeOutcome {
            document: self.dest,
            report: self.report,
            sources: self.sources,
        }
    }

    fn body_len(&self) -> usize {
        self.dest
            .body()
            .map(|body| body.elements().filter(|e| e.name != "w:sectPr").count())
            .unwrap_or(0)
    }

    /// Bookmark the first paragraph among the blocks just appended. The
    /// bookmark gets its real id and name in `finish`, once every bookmark
    /// name copied from the sources is known.
    fn anchor_source(&mut self, title: &str, start: usize, blocks: usize) {
        let index = self.sources.len();
        let pending = format!("{PENDING_PREFIX}{index}");

        let paragraph = self
            .dest
            .body_elements_mut()
            .filter(|e| e.name != "w:sectPr")
            .skip(start)
            .take(blocks)
            .find_map(first_paragraph);
        let Some(paragraph) = paragraph else {
            return;
        };

        let insert_at = paragraph
            .children
            .iter()
            .position(|node| !matches!(node, Node::Element(e) if e.name == "w:pPr"))
            .unwrap_or(paragraph.children.len());
        let start = element("w", "bookmarkStart")
            .with_attr("w:id", pending.as_str())
            .with_attr("w:name", pending.as_str());
        paragraph.children.insert(insert_at, Node::Element(start));
        paragraph.push(element("w", "bookmarkEnd").with_attr("w:id", pending.as_str()));

        self.pending_anchors
            .push((pending, index, anchor_base_name(title)));
    }

    /// Give every synthesized bookmark a registry id and a name no copied
    /// bookmark uses.
    fn assign_pending_anchors(&mut self) {
        let mut names = BTreeMap::new();
        for (pending, index, base) in &self.pending_anchors {
            let name = self.registry.claim_name(base);
            if let Some(source) = self.sources.get_mut(*index) {
                source.anchor = Some(name.clone());
            }
            names.insert(pending.clone(), name);
        }

        let mut ids = BTreeMap::new();
        let registry = &mut self.registry;
        for block in self.dest.body_elements_mut() {
            assign_in(block, registry, &names, &mut ids);
        }
    }

    fn contents_page(&self) -> Vec<Element> {
        let mut heading = element("w", "p");
        if self.dest.has_style("Heading1") {
            heading.push(
                element("w", "pPr")
                    .with_child(element("w", "pStyle").with_attr("w:val", "Heading1")),
            );
            heading.push(element("w", "r").with_child(text_element("Contents")));
        } else {
            heading.push(
                element("w", "r")
                    .with_child(
                        element("w", "rPr")
                            .with_child(element("w", "b"))
                            .with_child(element("w", "sz").with_attr("w:val", "32")),
                    )
                    .with_child(text_element("Contents")),
            );
        }

        let mut page = vec![heading];
        for source in &self.sources {
            let mut entry = element("w", "p");
            match &source.anchor {
                Some(anchor) => entry.push(internal_link(anchor, &source.name)),
                None => entry.push(element("w", "r").with_child(text_element(&source.name))),
            }
            page.push(entry);
        }
        page.push(page_break());
        page
    }
}

/// `src_<title>` with characters Word rejects in bookmark names replaced.
fn anchor_base_name(title: &str) -> String {
    let stem = UNSAFE_NAME_CHARS.replace_all(title, "_");
    format!("src_{}", stem.trim_matches('_'))
}

/// First paragraph at or below `block`, in document order.
fn first_paragraph(block: &mut Element) -> Option<&mut Element> {
    if block.name == "w:p" {
        return Some(block);
    }
    block.elements_mut().find_map(first_paragraph)
}

/// Replace pending bookmark ids under `el` with fresh registry ids, and
/// pending names with the names claimed for them. Start and end markers
/// share a pending id, so both receive the same fresh one.
fn assign_in(
    el: &mut Element,
    registry: &mut AnchorRegistry,
    names: &BTreeMap<String, String>,
    ids: &mut BTreeMap<String, String>,
) {
    if el.name == "w:bookmarkStart" || el.name == "w:bookmarkEnd" {
        if let Some(pending) = el.attr("w:id").filter(|id| id.starts_with(PENDING_PREFIX)) {
            let pending = pending.to_string();
            let fresh = ids
                .entry(pending.clone())
                .or_insert_with(|| registry.next_id())
                .clone();
            el.set_attr("w:id", fresh);
            if el.name == "w:bookmarkStart" {
                if let Some(name) = names.get(&pending) {
                    el.set_attr("w:name", name.as_str());
                }
            }
        }
    }
    for child in el.elements_mut() {
        assign_in(child, registry, names, ids);
    }
}

/// An underlined blue run linking to bookmark `anchor`.
fn internal_link(anchor: &str, text: &str) -> Element {
    let run = element("w", "r")
        .with_child(
            element("w", "rPr")
                .with_child(element("w", "color").with_attr("w:val", "0000FF"))
                .with_child(element("w", "u").with_attr("w:val", "single")),
        )
        .with_child(text_element(text));
    element("w", "hyperlink")
        .with_attr("w:anchor", anchor)
        .with_attr("w:history", "1")
        .with_child(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{paragraph_texts, Block};
    use crate::markup::{ns, parse};
    use crate::merge::registry::MAX_BOOKMARK_NAME;

    fn source(title: &str, body: &str) -> Document {
        let mut doc = Document::blank().unwrap();
        doc.title = title.to_string();
        let xml = format!(r#"<w:body xmlns:w="{}">{body}</w:body>"#, ns::W);
        for block in parse("test.xml", xml.as_bytes()).unwrap().elements() {
            doc.append_block(block.clone());
        }
        doc
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    #[test]
    fn test_page_breaks_only_between_sources() {
        let mut merger = Merger::new(MergeOptions::default()).unwrap();
        for (name, text) in [("a", "Alpha"), ("b", "Beta"), ("c", "Gamma")] {
            merger.append(&source(name, &para(text)));
        }
        let outcome = merger.finish();

        let kinds: Vec<_> = outcome
            .document
            .blocks()
            .into_iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.text()),
                Block::PageBreak(_) => Some("<break>".to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec!["Alpha", "<break>", "Beta", "<break>", "Gamma"]);
        assert_eq!(outcome.sources.len(), 3);
    }

    #[test]
    fn test_source_bookmarks_get_fresh_ids_above_observed() {
        let options = MergeOptions {
            source_bookmarks: true,
            contents_page: false,
        };
        let mut merger = Merger::new(options).unwrap();
        merger.append(&source("First Doc", &para("one")));
        merger.append(&source(
            "second",
            r#"<w:p><w:bookmarkStart w:id="9" w:name="kept"/><w:r><w:t>two</w:t></w:r><w:bookmarkEnd w:id="9"/></w:p>"#,
        ));
        let outcome = merger.finish();

        let body = outcome.document.body().unwrap();
        let starts = body.descendants("w:bookmarkStart");
        let ids: Vec<_> = starts.iter().filter_map(|b| b.attr("w:id")).collect();
        let names: Vec<_> = starts.iter().filter_map(|b| b.attr("w:name")).collect();
        assert_eq!(names, vec!["src_First_Doc", "src_second", "kept"]);
        assert_eq!(ids, vec!["10", "11", "9"]);
        assert!(body
            .descendants("w:bookmarkEnd")
            .iter()
            .all(|e| !e.attr("w:id").unwrap_or_default().starts_with(PENDING_PREFIX)));
    }

    #[test]
    fn test_contents_page_links_each_source() {
        let options = MergeOptions {
            source_bookmarks: false,
            contents_page: true,
        };
        let mut merger = Merger::new(options).unwrap();
        merger.append(&source("a", &para("Alpha")));
        merger.append(&source("a", &para("Again")));
        let outcome = merger.finish();

        let texts = paragraph_texts(&outcome.document);
        assert_eq!(texts[0], "Contents");
        assert_eq!(texts[1], "a");
        let links = outcome.document.body().unwrap().descendants("w:hyperlink");
        let anchors: Vec<_> = links.iter().filter_map(|l| l.attr("w:anchor")).collect();
        assert_eq!(anchors, vec!["src_a", "src_a_2"]);
        assert!(matches!(outcome.document.blocks()[3], Block::PageBreak(_)));
    }

    #[test]
    fn test_anchor_names_are_sanitized_and_bounded() {
        assert_eq!(anchor_base_name("Q3 report (final)"), "src_Q3_report_final");
        let mut registry = AnchorRegistry::new();
        let long = anchor_base_name(&"x".repeat(80));
        assert_eq!(registry.claim_name(&long).len(), MAX_BOOKMARK_NAME);
    }

    #[test]
    fn test_generated_anchor_avoids_copied_bookmark_name() {
        let options = MergeOptions {
            source_bookmarks: false,
            contents_page: true,
        };
        let mut merger = Merger::new(options).unwrap();
        merger.append(&source("b", &para("Alpha")));
        // Arrives after the first source already wanted `src_b`
        merger.append(&source(
            "other",
            r#"<w:p><w:bookmarkStart w:id="3" w:name="src_b"/><w:r><w:t>Beta</w:t></w:r><w:bookmarkEnd w:id="3"/></w:p>"#,
        ));
        let outcome = merger.finish();

        let body = outcome.document.body().unwrap();
        let names: Vec<_> = body
            .descendants("w:bookmarkStart")
            .iter()
            .filter_map(|b| b.attr("w:name"))
            .map(str::to_string)
            .collect();
        assert_eq!(names, vec!["src_b_2", "src_other", "src_b"]);
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());

        let anchors: Vec<_> = outcome.sources.iter().filter_map(|s| s.anchor.clone()).collect();
        assert_eq!(anchors, vec!["src_b_2", "src_other"]);
        let links = body.descendants("w:hyperlink");
        let targets: Vec<_> = links.iter().filter_map(|l| l.attr("w:anchor")).collect();
        assert_eq!(targets, vec!["src_b_2", "src_other"]);
    }
}
