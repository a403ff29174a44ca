//! Relationship sets (`*.rels` parts)
//!
//! Maps opaque relationship ids (`rId7`) to either an external target such
//! as a hyperlink URL or an internal part such as `word/media/image1.png`.

use std::collections::BTreeSet;

use crate::error::{CopyError, DocumentError};
use crate::markup::{self, ns, Element};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The relationships of one source part, resolved against that part's folder.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    /// Folder of the owning part, e.g. `word` for `word/document.xml`.
    base: String,
    items: Vec<Relationship>,
}

impl Relationships {
    pub fn new(base: impl Into<String>) -> Self {
        Relationships {
            base: base.into(),
            items: Vec::new(),
        }
    }

    /// Name of the `.rels` part holding the relationships of `part`.
    pub fn part_for(part: &str) -> String {
        match part.rsplit_once('/') {
            Some((folder, file)) => format!("{folder}/_rels/{file}.rels"),
            None => format!("_rels/{part}.rels"),
        }
    }

    pub fn parse(base: impl Into<String>, root: &Element) -> Self {
        let items = root
            .children_named("Relationship")
            .filter_map(|rel| {
                Some(Relationship {
                    id: rel.attr("Id")?.to_string(),
                    rel_type: rel.attr("Type").unwrap_or_default().to_string(),
                    target: rel.attr("Target")?.to_string(),
                    external: rel
                        .attr("TargetMode")
                        .is_some_and(|mode| mode.eq_ignore_ascii_case("External")),
                })
            })
            .collect();
        Relationships {
            base: base.into(),
            items,
        }
    }

    pub fn to_element(&self) -> Element {
        let mut root = Element::new("Relationships").with_attr("xmlns", ns::PACKAGE_RELATIONSHIPS);
        for rel in &self.items {
            let mut el = Element::new("Relationship")
                .with_attr("Id", rel.id.as_str())
                .with_attr("Type", rel.rel_type.as_str())
                .with_attr("Target", rel.target.as_str());
            if rel.external {
                el.set_attr("TargetMode", "External");
            }
            root.push(el);
        }
        root
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        markup::serialize(&self.to_element())
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// URL of an external relationship.
    pub fn external_target(&self, id: &str) -> Result<&str, CopyError> {
        match self.get(id) {
            Some(rel) if rel.external => Ok(&rel.target),
            _ => Err(CopyError::MissingRelationship(id.to_string())),
        }
    }

    /// Package part name an internal relationship points to.
    pub fn part_name(&self, id: &str) -> Result<String, CopyError> {
        match self.get(id) {
            Some(rel) if !rel.external => Ok(resolve_target(&self.base, &rel.target)),
            _ => Err(CopyError::MissingRelationship(id.to_string())),
        }
    }

    pub fn first_of_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.rel_type == rel_type)
    }

    /// Add a relationship under a fresh id and return that id.
    pub fn add(&mut self, rel_type: &str, target: impl Into<String>, external: bool) -> String {
        let taken: BTreeSet<u64> = self
            .items
            .iter()
            .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<u64>().ok())
            .collect();
        let next = match taken.last() {
            Some(&highest) if highest < u64::MAX => highest + 1,
            Some(_) => (1..).find(|n| !taken.contains(n)).unwrap_or(1),
            None => 1,
        };
        let id = format!("rId{next}");
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            external,
        });
        id
    }
}

/// Resolve a relationship target relative to `base`, folding `.` and `..`.
pub(crate) fn resolve_target(base: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base.is_empty() => target.to_string(),
        None => format!("{base}/{target}"),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Relationships {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
            <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
            <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/" TargetMode="External"/>
        </Relationships>"#;
        let root = markup::parse("word/_rels/document.xml.rels", xml.as_bytes()).unwrap();
        Relationships::parse("word", &root)
    }

    #[test]
    fn test_resolves_internal_and_external_targets() {
        let rels = sample();
        assert_eq!(rels.part_name("rId5").unwrap(), "word/media/image1.png");
        assert_eq!(rels.external_target("rId9").unwrap(), "https://example.com/");
        assert_eq!(
            rels.external_target("rId5"),
            Err(CopyError::MissingRelationship("rId5".to_string()))
        );
        assert!(rels.part_name("rId404").is_err());
    }

    #[test]
    fn test_add_uses_next_free_id() {
        let mut rels = sample();
        let id = rels.add(ns::rel::HYPERLINK, "https://rust-lang.org", true);
        assert_eq!(id, "rId10");
        assert_eq!(rels.len(), 4);
        let el = rels.to_element();
        let added = el.children_named("Relationship").last().unwrap();
        assert_eq!(added.attr("TargetMode"), Some("External"));
    }

    #[test]
    fn test_add_after_largest_numeric_id_reuses_a_gap() {
        let mut rels = Relationships::new("word");
        rels.add(ns::rel::HYPERLINK, "https://a.example/", true);
        rels.items.push(Relationship {
            id: format!("rId{}", u64::MAX),
            rel_type: ns::rel::HYPERLINK.to_string(),
            target: "https://b.example/".to_string(),
            external: true,
        });
        let id = rels.add(ns::rel::HYPERLINK, "https://c.example/", true);
        assert_eq!(id, "rId2");
        assert_eq!(rels.external_target("rId2").unwrap(), "https://c.example/");
    }

    #[test]
    fn test_resolve_target_folds_dot_segments() {
        assert_eq!(resolve_target("word", "../media/a.png"), "media/a.png");
        assert_eq!(resolve_target("word", "/word/media/a.png"), "word/media/a.png");
        assert_eq!(resolve_target("", "docProps/core.xml"), "docProps/core.xml");
        assert_eq!(Relationships::part_for("word/document.xml"), "word/_rels/document.xml.rels");
    }
}
