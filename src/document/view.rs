//! Borrowed views over body content
//!
//! Views never copy: each wraps a reference into a [`Document`] tree and
//! classifies it the way the copiers need to see it.
//!
//! [`Document`]: super::Document

use super::parsing::table::{cell_grid, MAX_COLUMNS};
use crate::markup::Element;

/// One top-level element of a document body.
#[derive(Debug, Clone, Copy)]
pub enum Block<'a> {
    Paragraph(Paragraph<'a>),
    Table(Table<'a>),
    /// A paragraph whose only content is a single page break.
    PageBreak(Paragraph<'a>),
    /// Section properties and anything else the copy engine does not handle.
    Other(&'a Element),
}

impl<'a> Block<'a> {
    pub fn classify(element: &'a Element) -> Self {
        match element.name.as_str() {
            "w:p" => {
                let paragraph = Paragraph::new(element);
                if paragraph.is_page_break() {
                    Block::PageBreak(paragraph)
                } else {
                    Block::Paragraph(paragraph)
                }
            }
            "w:tbl" => Block::Table(Table::new(element)),
            _ => Block::Other(element),
        }
    }
}

/// Inline containers whose children belong to the paragraph as if the
/// wrapper were not there.
const TRANSPARENT: &[&str] = &["w:ins", "w:smartTag", "w:customXml", "w:fldSimple"];

/// Inline markup that carries no visible content of its own.
const IGNORED: &[&str] = &[
    "w:pPr",
    "w:proofErr",
    "w:del",
    "w:moveFrom",
    "w:commentRangeStart",
    "w:commentRangeEnd",
    "w:permStart",
    "w:permEnd",
    "w:sdtPr",
    "w:sdtEndPr",
];

#[derive(Debug, Clone, Copy)]
pub struct Paragraph<'a> {
    element: &'a Element,
}

/// Inline content of a paragraph, flattened out of its wrappers.
#[derive(Debug, Clone, Copy)]
pub enum ParagraphItem<'a> {
    Run(Run<'a>),
    /// `w:bookmarkStart` or `w:bookmarkEnd`.
    Bookmark(&'a Element),
    /// Inline markup the engine cannot reproduce, e.g. equations.
    Unsupported(&'a Element),
}

impl<'a> Paragraph<'a> {
    pub fn new(element: &'a Element) -> Self {
        Paragraph { element }
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn properties(&self) -> Option<&'a Element> {
        self.element.child("w:pPr")
    }

    pub fn property(&self, name: &str) -> Option<&'a Element> {
        self.properties()?.child(name)
    }

    pub fn items(&self) -> Vec<ParagraphItem<'a>> {
        let mut items = Vec::new();
        collect_items(self.element, None, &mut items);
        items
    }

    pub fn runs(&self) -> Vec<Run<'a>> {
        self.items()
            .into_iter()
            .filter_map(|item| match item {
                ParagraphItem::Run(run) => Some(run),
                _ => None,
            })
            .collect()
    }

    /// Plain text of every run, tabs and breaks included.
    pub fn text(&self) -> String {
        self.runs().iter().map(Run::text).collect()
    }

    /// True for a paragraph holding one run with nothing but a page break.
    ///
    /// Run properties inside `w:pPr` are tolerated; any other paragraph
    /// property makes the paragraph ordinary content.
    pub fn is_page_break(&self) -> bool {
        if let Some(ppr) = self.properties() {
            if ppr.elements().any(|e| e.name != "w:rPr") {
                return false;
            }
        }
        let mut content = self.element.elements().filter(|e| e.name != "w:pPr");
        let (Some(run), None) = (content.next(), content.next()) else {
            return false;
        };
        if run.name != "w:r" {
            return false;
        }
        let mut inner = run.elements().filter(|e| e.name != "w:rPr");
        match (inner.next(), inner.next()) {
            (Some(br), None) => br.name == "w:br" && br.attr("w:type") == Some("page"),
            _ => false,
        }
    }
}

fn collect_items<'a>(
    parent: &'a Element,
    hyperlink: Option<Hyperlink<'a>>,
    items: &mut Vec<ParagraphItem<'a>>,
) {
    for child in parent.elements() {
        match child.name.as_str() {
            "w:r" => items.push(ParagraphItem::Run(Run {
                element: child,
                hyperlink,
            })),
            "w:hyperlink" => collect_items(child, Some(Hyperlink { element: child }), items),
            "w:bookmarkStart" | "w:bookmarkEnd" => items.push(ParagraphItem::Bookmark(child)),
            "w:sdt" => {
                if let Some(content) = child.child("w:sdtContent") {
                    collect_items(content, hyperlink, items);
                }
            }
            name if TRANSPARENT.contains(&name) => collect_items(child, hyperlink, items),
            name if IGNORED.contains(&name) => {}
            _ => items.push(ParagraphItem::Unsupported(child)),
        }
    }
}

/// A `w:hyperlink` wrapper around one or more runs.
#[derive(Debug, Clone, Copy)]
pub struct Hyperlink<'a> {
    element: &'a Element,
}

impl<'a> Hyperlink<'a> {
    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn rel_id(&self) -> Option<&'a str> {
        self.element.attr("r:id").filter(|id| !id.is_empty())
    }

    pub fn anchor(&self) -> Option<&'a str> {
        self.element.attr("w:anchor").filter(|a| !a.is_empty())
    }

    /// Whether both views wrap the same source element.
    pub fn same_as(&self, other: &Hyperlink<'_>) -> bool {
        std::ptr::eq(self.element, other.element)
    }
}

/// What a run carries: text-like content or pictures, never both.
#[derive(Debug, Clone)]
pub enum RunKind<'a> {
    Text(Vec<RunContent>),
    Image(Vec<ImageRef<'a>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunContent {
    Text(String),
    Tab,
    Break(BreakKind),
    /// Content reproduced as a verbatim clone (`w:sym`, hyphens).
    Verbatim(Element),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Line,
    Page,
    Column,
}

impl BreakKind {
    pub fn from_type(kind: Option<&str>) -> Self {
        match kind {
            Some("page") => BreakKind::Page,
            Some("column") => BreakKind::Column,
            _ => BreakKind::Line,
        }
    }

    pub fn as_type(self) -> Option<&'static str> {
        match self {
            BreakKind::Line => None,
            BreakKind::Page => Some("page"),
            BreakKind::Column => Some("column"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Run<'a> {
    element: &'a Element,
    hyperlink: Option<Hyperlink<'a>>,
}

impl<'a> Run<'a> {
    pub fn new(element: &'a Element) -> Self {
        Run {
            element,
            hyperlink: None,
        }
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn properties(&self) -> Option<&'a Element> {
        self.element.child("w:rPr")
    }

    pub fn property(&self, name: &str) -> Option<&'a Element> {
        self.properties()?.child(name)
    }

    /// The hyperlink this run sits in, if any.
    pub fn hyperlink(&self) -> Option<Hyperlink<'a>> {
        self.hyperlink
    }

    pub fn kind(&self) -> RunKind<'a> {
        let drawings = self.element.descendants("w:drawing");
        if !drawings.is_empty() {
            return RunKind::Image(drawings.into_iter().map(ImageRef::new).collect());
        }

        let mut content = Vec::new();
        for child in self.element.elements() {
            match child.name.as_str() {
                "w:t" => content.push(RunContent::Text(child.text())),
                "w:tab" | "w:ptab" => content.push(RunContent::Tab),
                "w:br" => content.push(RunContent::Break(BreakKind::from_type(child.attr("w:type")))),
                "w:cr" => content.push(RunContent::Break(BreakKind::Line)),
                "w:noBreakHyphen" | "w:softHyphen" | "w:sym" => {
                    content.push(RunContent::Verbatim(child.deep_clone()))
                }
                // Field codes and layout hints are not visible content
                _ => {}
            }
        }
        RunKind::Text(content)
    }

    pub fn text(&self) -> String {
        match self.kind() {
            RunKind::Text(content) => content
                .iter()
                .map(|c| match c {
                    RunContent::Text(t) => t.as_str(),
                    RunContent::Tab => "\t",
                    RunContent::Break(_) => "\n",
                    RunContent::Verbatim(_) => "",
                })
                .collect(),
            RunKind::Image(_) => String::new(),
        }
    }
}

/// A `w:drawing` that may embed a picture.
#[derive(Debug, Clone, Copy)]
pub struct ImageRef<'a> {
    drawing: &'a Element,
}

impl<'a> ImageRef<'a> {
    pub fn new(drawing: &'a Element) -> Self {
        ImageRef { drawing }
    }

    pub fn drawing(&self) -> &'a Element {
        self.drawing
    }

    /// Relationship id of the embedded picture (`a:blip r:embed`).
    pub fn embed_id(&self) -> Option<&'a str> {
        self.drawing.find("a:blip")?.attr("r:embed")
    }

    pub fn description(&self) -> Option<&'a str> {
        self.drawing.find("wp:docPr")?.attr("descr")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    element: &'a Element,
}

impl<'a> Table<'a> {
    pub fn new(element: &'a Element) -> Self {
        Table { element }
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn properties(&self) -> Option<&'a Element> {
        self.element.child("w:tblPr")
    }

    pub fn property(&self, name: &str) -> Option<&'a Element> {
        self.properties()?.child(name)
    }

    pub fn style_id(&self) -> Option<&'a str> {
        self.property("w:tblStyle")?.attr("w:val")
    }

    pub fn grid(&self) -> Option<&'a Element> {
        self.element.child("w:tblGrid")
    }

    pub fn row_count(&self) -> usize {
        self.element.children_named("w:tr").count()
    }

    /// Declared grid columns, or the widest row when the grid is missing.
    /// Never more than Word's 63-column limit.
    pub fn column_count(&self) -> usize {
        let declared = self
            .grid()
            .map(|grid| grid.children_named("w:gridCol").count())
            .unwrap_or(0);
        if declared > 0 {
            return declared.min(MAX_COLUMNS);
        }
        self.cells().iter().map(Vec::len).max().unwrap_or(0)
    }

    /// The logical cell grid: `cells()[r][c]` is the cell covering grid
    /// position (r, c), with spans and vertical merges resolved.
    pub fn cells(&self) -> Vec<Vec<Option<Cell<'a>>>> {
        cell_grid(self.element)
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.map(Cell::new)).collect())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    element: &'a Element,
}

impl<'a> Cell<'a> {
    pub fn new(element: &'a Element) -> Self {
        Cell { element }
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn properties(&self) -> Option<&'a Element> {
        self.element.child("w:tcPr")
    }

    pub fn property(&self, name: &str) -> Option<&'a Element> {
        self.properties()?.child(name)
    }

    pub fn paragraphs(&self) -> Vec<Paragraph<'a>> {
        self.element
            .children_named("w:p")
            .map(Paragraph::new)
            .collect()
    }

    pub fn nested_tables(&self) -> usize {
        self.element.children_named("w:tbl").count()
    }

    pub fn text(&self) -> String {
        self.paragraphs()
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
