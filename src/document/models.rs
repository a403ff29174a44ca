//! Core data structures for document representation
//!
//! [`Document`] owns one loaded package: its raw parts, the parsed body tree,
//! the body's relationship set and the metadata record. Everything else in
//! this module is a small value type read out of that tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use super::package::{Package, DEFAULT_MAIN_PART, PACKAGE_RELS_PART};
use super::properties;
use super::relationships::{resolve_target, Relationships};
use super::view::Block;
use crate::error::DocumentError;
use crate::markup::{self, ns, Element, Node};

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// EMU per pixel at 96 DPI.
pub const EMU_PER_PIXEL: i64 = 9_525;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distribute,
}

impl Alignment {
    pub fn from_val(val: &str) -> Option<Self> {
        match val {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" => Some(Alignment::Justify),
            "distribute" => Some(Alignment::Distribute),
            _ => None,
        }
    }

    pub fn as_val(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
            Alignment::Distribute => "distribute",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LineRule {
    Auto,
    Exact,
    AtLeast,
}

impl LineRule {
    pub fn from_val(val: &str) -> Option<Self> {
        match val {
            "auto" => Some(LineRule::Auto),
            "exact" => Some(LineRule::Exact),
            "atLeast" => Some(LineRule::AtLeast),
            _ => None,
        }
    }

    pub fn as_val(self) -> &'static str {
        match self {
            LineRule::Auto => "auto",
            LineRule::Exact => "exact",
            LineRule::AtLeast => "atLeast",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerticalAlign {
    Baseline,
    Superscript,
    Subscript,
}

impl VerticalAlign {
    pub fn from_val(val: &str) -> Option<Self> {
        match val {
            "baseline" => Some(VerticalAlign::Baseline),
            "superscript" => Some(VerticalAlign::Superscript),
            "subscript" => Some(VerticalAlign::Subscript),
            _ => None,
        }
    }

    pub fn as_val(self) -> &'static str {
        match self {
            VerticalAlign::Baseline => "baseline",
            VerticalAlign::Superscript => "superscript",
            VerticalAlign::Subscript => "subscript",
        }
    }
}

/// 24-bit color as stored in `w:color w:val="RRGGBB"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = ();

    fn from_str(hex: &str) -> Result<Self, Self::Err> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(());
        }
        let channel = |range| u8::from_str_radix(&hex[range], 16).map_err(|_| ());
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// A length in English Metric Units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Emu(pub i64);

impl Emu {
    pub fn from_inches(inches: f64) -> Self {
        Emu((inches * EMU_PER_INCH as f64).round() as i64)
    }

    pub fn from_pixels(pixels: u32) -> Self {
        Emu(i64::from(pixels) * EMU_PER_PIXEL)
    }

    pub fn inches(self) -> f64 {
        self.0 as f64 / EMU_PER_INCH as f64
    }
}

/// Declared on-page size of a drawing (`wp:extent cx/cy`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Extent {
    pub cx: Emu,
    pub cy: Emu,
}

impl Extent {
    pub fn width_inches(&self) -> f64 {
        self.cx.inches()
    }

    pub fn height_inches(&self) -> f64 {
        self.cy.inches()
    }
}

/// Paragraph-level formatting as read back from a paragraph.
///
/// Indents and spacing are in twentieths of a point, exactly as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParagraphFormat {
    pub style: Option<String>,
    pub alignment: Option<Alignment>,
    pub left_indent: Option<i32>,
    pub right_indent: Option<i32>,
    pub space_before: Option<u32>,
    pub space_after: Option<u32>,
    pub line_spacing: Option<i32>,
    pub line_rule: Option<LineRule>,
}

/// Character formatting of a text run.
///
/// Toggles are tri-state: `None` means "not set on this run", which lets the
/// destination style decide.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextFormatting {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<String>,
    pub strikethrough: Option<bool>,
    pub vertical_align: Option<VerticalAlign>,
    pub font_size: Option<f32>,
    pub font_name: Option<String>,
    pub color: Option<Rgb>,
    pub style: Option<String>,
}

impl TextFormatting {
    pub fn is_bold(&self) -> bool {
        self.bold == Some(true)
    }

    pub fn is_italic(&self) -> bool {
        self.italic == Some(true)
    }

    pub fn is_underlined(&self) -> bool {
        self.underline.as_deref().is_some_and(|u| u != "none")
    }

    pub fn is_struck(&self) -> bool {
        self.strikethrough == Some(true)
    }
}

/// A loaded WordprocessingML package.
#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    package: Package,
    main_part: String,
    root: Element,
    relationships: Relationships,
    core_part: String,
    core: Option<Element>,
    core_created: bool,
    style_ids: BTreeSet<String>,
    media_types: Vec<(String, String)>,
    drawing_ids: BTreeSet<u32>,
}

impl Document {
    /// Load a package from raw `.docx` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::from_package(Package::from_bytes(bytes)?)
    }

    /// Load a package from a file on disk.
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path)?;
        let mut document = Self::from_bytes(&bytes)?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            document.title = stem.to_string();
        }
        Ok(document)
    }

    /// An empty destination document built from the docx-rs default template.
    pub fn blank() -> Result<Self, DocumentError> {
        let mut buffer = Cursor::new(Vec::new());
        docx_rs::Docx::new()
            .build()
            .pack(&mut buffer)
            .map_err(|e| DocumentError::Template(e.to_string()))?;
        let mut document = Self::from_bytes(&buffer.into_inner())?;
        document.title = "Merged Document".to_string();
        // A merge starts from an empty body and empty metadata
        if let Some(body) = document.root.child_mut("w:body") {
            body.remove_children("w:p");
        }
        if let Some(core) = document.core.as_mut() {
            for field in properties::CoreField::ALL {
                properties::write_field(core, field, None);
            }
        }
        Ok(document)
    }

    pub fn from_package(package: Package) -> Result<Self, DocumentError> {
        let package_rels = match package.xml(PACKAGE_RELS_PART) {
            Ok(root) => Relationships::parse("", &root),
            Err(_) => Relationships::new(""),
        };
        let main_part = package_rels
            .first_of_type(ns::rel::OFFICE_DOCUMENT)
            .map(|rel| resolve_target("", &rel.target))
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());

        let root = package.xml(&main_part)?;
        if root.name != "w:document" {
            return Err(DocumentError::InvalidFormat(format!(
                "{main_part} has root element {}",
                root.name
            )));
        }

        let base = main_part
            .rsplit_once('/')
            .map(|(folder, _)| folder.to_string())
            .unwrap_or_default();
        let relationships = match package.xml(&Relationships::part_for(&main_part)) {
            Ok(rels) => Relationships::parse(base.clone(), &rels),
            Err(DocumentError::MissingPart(_)) => Relationships::new(base.clone()),
            Err(e) => return Err(e),
        };

        let core_part = package_rels
            .first_of_type(ns::rel::CORE_PROPERTIES)
            .map(|rel| resolve_target("", &rel.target))
            .unwrap_or_else(|| properties::DEFAULT_CORE_PART.to_string());
        let core = match package.xml(&core_part) {
            Ok(core) => Some(core),
            Err(e) => {
                log::debug!("no usable core properties in {core_part}: {e}");
                None
            }
        };

        let style_ids = relationships
            .first_of_type(ns::rel::STYLES)
            .and_then(|rel| package.xml(&resolve_target(&base, &rel.target)).ok())
            .map(|styles| {
                styles
                    .children_named("w:style")
                    .filter_map(|style| style.attr("w:styleId"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let drawing_ids = root
            .descendants("wp:docPr")
            .iter()
            .filter_map(|pr| pr.attr("id")?.parse::<u32>().ok())
            .collect();

        Ok(Document {
            title: "Untitled Document".to_string(),
            package,
            main_part,
            root,
            relationships,
            core_part,
            core,
            core_created: false,
            style_ids,
            media_types: Vec::new(),
            drawing_ids,
        })
    }

    /// Serialize the document back into `.docx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut package = self.package.clone();

        let mut root = self.root.clone();
        declare_known_namespaces(&mut root);
        package.insert(self.main_part.clone(), markup::serialize(&root)?);
        package.insert(
            Relationships::part_for(&self.main_part),
            self.relationships.to_bytes()?,
        );

        let mut overrides = Vec::new();
        if let Some(core) = &self.core {
            package.insert(self.core_part.clone(), markup::serialize(core)?);
            if self.core_created {
                let mut package_rels = match package.xml(PACKAGE_RELS_PART) {
                    Ok(root) => Relationships::parse("", &root),
                    Err(_) => Relationships::new(""),
                };
                if package_rels.first_of_type(ns::rel::CORE_PROPERTIES).is_none() {
                    package_rels.add(ns::rel::CORE_PROPERTIES, self.core_part.clone(), false);
                    package.insert(PACKAGE_RELS_PART, package_rels.to_bytes()?);
                }
                overrides.push((self.core_part.as_str(), properties::CORE_CONTENT_TYPE));
            }
        }

        package.update_content_types(&self.media_types, &overrides)?;
        Ok(package.write(Cursor::new(Vec::new()))?.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn body(&self) -> Option<&Element> {
        self.root.child("w:body")
    }

    /// Top-level blocks of the body in document order.
    pub fn blocks(&self) -> Vec<Block<'_>> {
        self.body()
            .map(|body| body.elements().map(Block::classify).collect())
            .unwrap_or_default()
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.package.get(name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.package.names()
    }

    pub fn has_style(&self, style_id: &str) -> bool {
        self.style_ids.contains(style_id)
    }

    pub fn core_properties(&self) -> Option<&Element> {
        self.core.as_ref()
    }

    /// Width between the page margins in twips, from the body's section
    /// properties. Falls back to 6.5 inches.
    pub fn text_width_twips(&self) -> u32 {
        const DEFAULT: u32 = 9_360;
        let Some(sect) = self.body().and_then(|body| body.child("w:sectPr")) else {
            return DEFAULT;
        };
        let twips = |el: Option<&Element>, key: &str| -> Option<i64> {
            el?.attr(key)?.parse().ok()
        };
        let page = twips(sect.child("w:pgSz"), "w:w");
        let left = twips(sect.child("w:pgMar"), "w:left").unwrap_or(0);
        let right = twips(sect.child("w:pgMar"), "w:right").unwrap_or(0);
        match page {
            Some(width) if width - left - right > 0 => (width - left - right) as u32,
            _ => DEFAULT,
        }
    }

    /// Namespace URI the document root binds to `prefix`.
    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.root.attr(&format!("xmlns:{prefix}"))
    }

    fn body_mut(&mut self) -> &mut Element {
        self.root.ensure_child_ordered("w:body", &[])
    }

    /// Append a block, keeping the body's trailing section properties last.
    pub fn append_block(&mut self, block: Element) {
        let body = self.body_mut();
        let index = body
            .children
            .iter()
            .rposition(|node| matches!(node, Node::Element(e) if e.name == "w:sectPr"))
            .unwrap_or(body.children.len());
        body.children.insert(index, Node::Element(block));
    }

    /// Insert blocks at the very start of the body, in the given order.
    pub fn prepend_blocks(&mut self, blocks: Vec<Element>) {
        let body = self.body_mut();
        for (offset, block) in blocks.into_iter().enumerate() {
            body.children.insert(offset, Node::Element(block));
        }
    }

    /// Mutable access to the body's top-level elements.
    pub fn body_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.body_mut().elements_mut()
    }

    /// Register an external hyperlink and return its relationship id.
    pub fn add_hyperlink(&mut self, url: &str) -> String {
        self.relationships.add(ns::rel::HYPERLINK, url, true)
    }

    /// Store an image as a new media part and return its relationship id.
    pub fn add_image(&mut self, bytes: Vec<u8>, extension: &str, content_type: &str) -> String {
        let base = self.relationships_base();
        let stem = if base.is_empty() {
            "media/image".to_string()
        } else {
            format!("{base}/media/image")
        };
        let part_name = self.package.unused_name(&stem, extension);
        let target = part_name
            .strip_prefix(&format!("{base}/"))
            .unwrap_or(&part_name)
            .to_string();
        self.package.insert(part_name, bytes);

        if !self
            .media_types
            .iter()
            .any(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        {
            self.media_types
                .push((extension.to_string(), content_type.to_string()));
        }
        self.relationships.add(ns::rel::IMAGE, target, false)
    }

    fn relationships_base(&self) -> String {
        self.main_part
            .rsplit_once('/')
            .map(|(folder, _)| folder.to_string())
            .unwrap_or_default()
    }

    /// Fresh id for a `wp:docPr` drawing property.
    pub fn next_drawing_id(&mut self) -> u32 {
        let mut id = self
            .drawing_ids
            .last()
            .map_or(1, |highest| highest.saturating_add(1));
        if self.drawing_ids.contains(&id) {
            // The top of the id range is taken, fall back to the lowest gap
            id = (1..=u32::MAX)
                .find(|candidate| !self.drawing_ids.contains(candidate))
                .unwrap_or(id);
        }
        self.drawing_ids.insert(id);
        id
    }

    /// Declare `prefix` on the document root unless it is already bound.
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        let key = format!("xmlns:{prefix}");
        if self.root.attr(&key).is_none() {
            self.root.set_attr(&key, uri);
        }
    }

    /// Declare on this document's root every prefix `subtree` uses that
    /// `source` binds, so verbatim copies stay well-formed.
    ///
    /// A prefix this document already binds to a different URI cannot be
    /// shared. The source URI then goes under another prefix, and the
    /// returned `(from, to)` pairs say how the subtree must be renamed.
    pub fn adopt_namespaces(
        &mut self,
        subtree: &Element,
        source: &Document,
    ) -> Vec<(String, String)> {
        let mut renames = Vec::new();
        let used = subtree.prefixes();
        for prefix in used.iter().cloned() {
            let Some(uri) = source.namespace_uri(&prefix).map(str::to_string) else {
                continue;
            };
            match self.namespace_uri(&prefix).map(str::to_string) {
                None => self.declare_namespace(&prefix, &uri),
                Some(bound) if bound == uri => {}
                Some(_) => {
                    let alias = self.prefix_for(&uri).unwrap_or_else(|| {
                        let alias = (2u32..)
                            .map(|n| format!("{prefix}{n}"))
                            .find(|candidate| {
                                self.namespace_uri(candidate).is_none() && !used.contains(candidate)
                            })
                            .unwrap_or_else(|| format!("{prefix}_"));
                        self.declare_namespace(&alias, &uri);
                        alias
                    });
                    log::debug!("namespace prefix {prefix} taken, copying {uri} as {alias}");
                    renames.push((prefix, alias));
                }
            }
        }
        renames
    }

    /// A prefix this document's root binds to `uri`.
    fn prefix_for(&self, uri: &str) -> Option<String> {
        self.root.attributes.iter().find_map(|(key, value)| {
            let prefix = key.strip_prefix("xmlns:")?;
            (value == uri).then(|| prefix.to_string())
        })
    }

    /// The metadata record, created empty on first write if the package had none.
    pub(crate) fn core_mut(&mut self) -> &mut Element {
        if self.core.is_none() {
            self.core_created = true;
        }
        self.core.get_or_insert_with(properties::blank_core)
    }
}

/// Bind every canonical prefix used under `root` that it does not declare yet.
fn declare_known_namespaces(root: &mut Element) {
    for prefix in root.prefixes() {
        let key = format!("xmlns:{prefix}");
        if root.attr(&key).is_some() {
            continue;
        }
        if let Some(uri) = ns::uri_for(&prefix) {
            root.set_attr(&key, uri);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_parse_and_display() {
        assert_eq!("FF0000".parse::<Rgb>(), Ok(Rgb(255, 0, 0)));
        assert_eq!("#00ff7f".parse::<Rgb>(), Ok(Rgb(0, 255, 127)));
        assert!("auto".parse::<Rgb>().is_err());
        assert!("12345".parse::<Rgb>().is_err());
        assert_eq!(Rgb(1, 171, 255).to_string(), "01ABFF");
    }

    #[test]
    fn test_emu_conversions() {
        assert_eq!(Emu(914_400).inches(), 1.0);
        assert_eq!(Emu(457_200).inches(), 0.5);
        assert_eq!(Emu::from_inches(2.5), Emu(2_286_000));
        assert_eq!(Emu::from_pixels(96), Emu(914_400));
    }

    #[test]
    fn test_alignment_vals() {
        assert_eq!(Alignment::from_val("both"), Some(Alignment::Justify));
        assert_eq!(Alignment::from_val("start"), Some(Alignment::Left));
        assert_eq!(Alignment::Justify.as_val(), "both");
        assert_eq!(Alignment::from_val("sideways"), None);
    }

    fn with_body(namespaces: &str, body: &str) -> Document {
        let xml = format!(
            r#"<w:document xmlns:w="{}" {namespaces}><w:body>{body}</w:body></w:document>"#,
            ns::W
        );
        let mut document = Document::blank().unwrap();
        document.root = crate::markup::parse("word/document.xml", xml.as_bytes()).unwrap();
        document
    }

    #[test]
    fn test_drawing_ids_survive_the_top_of_the_range() {
        let mut document = with_body(
            r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing""#,
            "",
        );
        document.drawing_ids.extend([1, 2, u32::MAX]);
        assert_eq!(document.next_drawing_id(), 3);
        assert_eq!(document.next_drawing_id(), 4);

        document.drawing_ids.clear();
        assert_eq!(document.next_drawing_id(), 1);
        assert_eq!(document.next_drawing_id(), 2);
    }

    #[test]
    fn test_conflicting_prefix_is_renamed() {
        let mut dest = with_body(r#"xmlns:x="urn:dest-x""#, "");
        let source = with_body(
            r#"xmlns:x="urn:source-x" xmlns:y="urn:shared""#,
            r#"<x:shape y:tag="1"/>"#,
        );
        let subtree = Element::new("x:shape").with_attr("y:tag", "1");

        let renames = dest.adopt_namespaces(&subtree, &source);
        assert_eq!(renames, vec![("x".to_string(), "x2".to_string())]);
        assert_eq!(dest.namespace_uri("x"), Some("urn:dest-x"));
        assert_eq!(dest.namespace_uri("x2"), Some("urn:source-x"));
        assert_eq!(dest.namespace_uri("y"), Some("urn:shared"));

        // A second copy reuses the alias instead of minting another
        let again = dest.adopt_namespaces(&subtree, &source);
        assert_eq!(again, vec![("x".to_string(), "x2".to_string())]);
        assert_eq!(dest.namespace_uri("x3"), None);
    }

    #[test]
    fn test_blank_document_is_empty_and_reloads() {
        let blank = Document::blank().unwrap();
        assert!(blank.blocks().is_empty());

        let reloaded = Document::from_bytes(&blank.to_bytes().unwrap()).unwrap();
        assert!(reloaded.body().is_some());
        assert!(reloaded.blocks().is_empty());
    }
}
