//! Markup node utilities
//!
//! A small owned XML tree used for every WordprocessingML part the engine
//! touches. Element names keep their qualified form (`w:p`, `a:blip`) with
//! namespace prefixes normalized on parse, so lookups never depend on the
//! prefixes a particular producer chose.

pub mod ns;
pub(crate) mod reader;
pub mod schema;
pub(crate) mod writer;

use std::collections::BTreeSet;

pub use reader::parse;
pub use writer::serialize;

/// A node in the tree: an element or a run of character data.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its attributes (in document order) and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Create a namespaced element, e.g. `element("w", "p")` for `<w:p/>`.
pub fn element(prefix: &str, local: &str) -> Element {
    Element::new(ns::qn(prefix, local))
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(index).1)
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Child elements, skipping character data.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    pub fn has_element_children(&self) -> bool {
        self.elements().next().is_some()
    }

    /// First descendant (depth-first, document order) with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in self.elements() {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given name, in document order.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Concatenated character data of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        self.children.push(Node::Text(text.into()));
    }

    /// Remove every child element with the given name, returning how many went.
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, Node::Element(e) if e.name == name));
        before - self.children.len()
    }

    /// Deep copy of this subtree, detached from its parent.
    pub fn deep_clone(&self) -> Element {
        self.clone()
    }

    /// Namespace prefixes used by element and attribute names in this subtree.
    pub fn prefixes(&self) -> BTreeSet<String> {
        let mut prefixes = BTreeSet::new();
        self.collect_prefixes(&mut prefixes);
        prefixes
    }

    fn collect_prefixes(&self, prefixes: &mut BTreeSet<String>) {
        if let Some(prefix) = self.prefix() {
            prefixes.insert(prefix.to_string());
        }
        for (key, _) in &self.attributes {
            if let Some((prefix, _)) = key.split_once(':') {
                if prefix != "xmlns" && prefix != "xml" {
                    prefixes.insert(prefix.to_string());
                }
            }
        }
        for child in self.elements() {
            child.collect_prefixes(prefixes);
        }
    }

    /// Rewrite element and attribute names in this subtree, renaming each
    /// `from` prefix to its `to`. All pairs apply at once, so a `to` that is
    /// also a `from` is not renamed twice.
    pub fn rename_prefixes(&mut self, renames: &[(String, String)]) {
        let rename = |name: &mut String| {
            let renamed = name.split_once(':').and_then(|(prefix, local)| {
                renames
                    .iter()
                    .find(|(from, _)| from == prefix)
                    .map(|(_, to)| ns::qn(to, local))
            });
            if let Some(renamed) = renamed {
                *name = renamed;
            }
        };
        rename(&mut self.name);
        for (key, _) in &mut self.attributes {
            rename(key);
        }
        for child in self.elements_mut() {
            child.rename_prefixes(renames);
        }
    }

    /// Insert `child` among this element's children according to a schema
    /// sequence, replacing any existing child with the same name. Names not
    /// listed in `order` sort after all listed ones.
    pub fn set_child_ordered(&mut self, child: Element, order: &[&str]) {
        self.remove_children(&child.name);
        let index = self.ordered_position(&child.name, order);
        self.children.insert(index, Node::Element(child));
    }

    /// Get the named child, inserting an empty one in schema position first if
    /// it does not exist yet.
    pub fn ensure_child_ordered(&mut self, name: &str, order: &[&str]) -> &mut Element {
        let existing = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.name == name));
        let index = match existing {
            Some(index) => index,
            None => {
                let index = self.ordered_position(name, order);
                self.children.insert(index, Node::Element(Element::new(name)));
                index
            }
        };
        match &mut self.children[index] {
            Node::Element(e) => e,
            Node::Text(_) => unreachable!("index always points at an element"),
        }
    }

    fn ordered_position(&self, name: &str, order: &[&str]) -> usize {
        let rank = |n: &str| order.iter().position(|o| *o == n).unwrap_or(order.len());
        let wanted = rank(name);
        self.children
            .iter()
            .position(|node| match node {
                Node::Element(e) => rank(&e.name) > wanted,
                Node::Text(_) => false,
            })
            .unwrap_or(self.children.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        element("w", "p")
            .with_child(element("w", "pPr").with_child(element("w", "jc").with_attr("w:val", "center")))
            .with_child(
                element("w", "r")
                    .with_child(element("w", "t").with_attr("xml:space", "preserve")),
            )
    }

    #[test]
    fn test_attribute_read_write() {
        let mut el = element("w", "ind");
        assert_eq!(el.attr("w:left"), None);
        el.set_attr("w:left", "720");
        el.set_attr("w:left", "1440");
        assert_eq!(el.attr("w:left"), Some("1440"));
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.remove_attr("w:left").as_deref(), Some("1440"));
    }

    #[test]
    fn test_deep_clone_is_detached() {
        let original = sample();
        let mut copy = original.deep_clone();
        copy.child_mut("w:pPr")
            .and_then(|ppr| ppr.child_mut("w:jc"))
            .map(|jc| jc.set_attr("w:val", "right"));
        assert_eq!(
            original.find("w:jc").and_then(|jc| jc.attr("w:val")),
            Some("center")
        );
        assert_eq!(copy.find("w:jc").and_then(|jc| jc.attr("w:val")), Some("right"));
    }

    #[test]
    fn test_prefixes_skip_reserved() {
        let el = sample().with_attr("w14:paraId", "1A2B");
        let prefixes: Vec<_> = el.prefixes().into_iter().collect();
        assert_eq!(prefixes, vec!["w".to_string(), "w14".to_string()]);
    }

    #[test]
    fn test_rename_prefix_touches_names_and_attributes_only() {
        let mut el = Element::new("x:shape")
            .with_attr("x:kind", "box")
            .with_attr("xy:other", "kept")
            .with_child(Element::new("x:fill").with_attr("w:val", "x:literal"));
        el.rename_prefixes(&[
            ("x".to_string(), "x2".to_string()),
            ("x2".to_string(), "x3".to_string()),
        ]);
        assert_eq!(el.name, "x2:shape");
        assert_eq!(el.attr("x2:kind"), Some("box"));
        assert_eq!(el.attr("xy:other"), Some("kept"));
        let fill = el.find("x2:fill").unwrap();
        assert_eq!(fill.attr("w:val"), Some("x:literal"));
    }

    #[test]
    fn test_ordered_insertion_replaces_and_sorts() {
        let order = ["w:pStyle", "w:pBdr", "w:shd", "w:spacing", "w:ind", "w:jc"];
        let mut ppr = element("w", "pPr");
        ppr.set_child_ordered(element("w", "jc"), &order);
        ppr.set_child_ordered(element("w", "pStyle"), &order);
        ppr.set_child_ordered(element("w", "shd").with_attr("w:fill", "FF0000"), &order);
        ppr.set_child_ordered(element("w", "shd").with_attr("w:fill", "00FF00"), &order);
        ppr.ensure_child_ordered("w:ind", &order).set_attr("w:left", "10");

        let names: Vec<_> = ppr.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["w:pStyle", "w:shd", "w:ind", "w:jc"]);
        assert_eq!(ppr.child("w:shd").and_then(|s| s.attr("w:fill")), Some("00FF00"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let el = sample();
        assert_eq!(el.descendants("w:t").len(), 1);
        assert!(el.find("w:missing").is_none());
        assert_eq!(el.local_name(), "p");
    }
}
