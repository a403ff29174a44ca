//! Fallback rendering: DOCX to HTML, then `wkhtmltopdf`
//!
//! The HTML keeps what matters on paper: headings, inline formatting, links,
//! tables, images (inlined as data URIs) and page breaks.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use super::{RenderTimeouts, Renderer};
use crate::document::parsing::drawing;
use crate::document::{
    Alignment, Block, Document, ImageRef, Paragraph, ParagraphFormat, ParagraphItem, Run, RunKind,
    Table, TextFormatting,
};

pub const WKHTMLTOPDF_PROGRAM: &str = "wkhtmltopdf";

#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    timeout: Duration,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new(RenderTimeouts::default().html)
    }
}

impl HtmlRenderer {
    pub fn new(timeout: Duration) -> Self {
        HtmlRenderer { timeout }
    }
}

#[async_trait]
impl Renderer for HtmlRenderer {
    fn name(&self) -> &'static str {
        "html+wkhtmltopdf"
    }

    fn is_available(&self) -> bool {
        which::which(WKHTMLTOPDF_PROGRAM).is_ok()
    }

    async fn render(&self, input: &Path, output: &Path) -> Result<()> {
        let bytes = tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let document = Document::from_bytes(&bytes)?;
        let html = document_to_html(&document);

        let workdir = tempfile::tempdir().context("Failed to create conversion directory")?;
        let html_path = workdir.path().join("document.html");
        tokio::fs::write(&html_path, html).await?;

        let mut command = Command::new(WKHTMLTOPDF_PROGRAM);
        command
            .args(["--quiet", "--enable-local-file-access"])
            .arg(&html_path)
            .arg(output)
            .kill_on_drop(true);

        let result = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.context("Failed to execute wkhtmltopdf")?,
            Err(_) => bail!("wkhtmltopdf timed out after {}s", self.timeout.as_secs()),
        };
        if !result.status.success() {
            bail!(
                "wkhtmltopdf conversion failed: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            );
        }
        if !output.exists() {
            bail!("PDF not generated at {}", output.display());
        }
        Ok(())
    }
}

/// Convert a document body to a standalone HTML page.
pub fn document_to_html(document: &Document) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(&document.title));
    html.push_str(
        "<style>\nbody { font-family: Calibri, Arial, sans-serif; font-size: 11pt; }\n\
         table { border-collapse: collapse; margin: 6pt 0; }\n\
         td { border: 1px solid #999; padding: 2pt 5pt; vertical-align: top; }\n\
         .page-break { page-break-after: always; }\n</style>\n</head>\n<body>\n",
    );

    for block in document.blocks() {
        match block {
            Block::Paragraph(paragraph) => write_paragraph(&mut html, document, &paragraph),
            Block::Table(table) => write_table(&mut html, document, &table),
            Block::PageBreak(_) => html.push_str("<div class=\"page-break\"></div>\n"),
            Block::Other(_) => {}
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn write_paragraph(html: &mut String, document: &Document, paragraph: &Paragraph<'_>) {
    let format = ParagraphFormat::of(paragraph);
    let tag = match format.style.as_deref().and_then(heading_level) {
        Some(level) => format!("h{level}"),
        None => "p".to_string(),
    };
    let style = match format.alignment {
        Some(Alignment::Center) => " style=\"text-align: center\"",
        Some(Alignment::Right) => " style=\"text-align: right\"",
        Some(Alignment::Justify) => " style=\"text-align: justify\"",
        _ => "",
    };

    let _ = write!(html, "<{tag}{style}>");
    let mut open_link: Option<String> = None;
    for item in paragraph.items() {
        match item {
            ParagraphItem::Run(run) => {
                let href = link_target(document, &run);
                if href != open_link {
                    if open_link.is_some() {
                        html.push_str("</a>");
                    }
                    if let Some(href) = &href {
                        let _ = write!(html, "<a href=\"{}\">", escape(href));
                    }
                    open_link = href;
                }
                write_run(html, document, &run);
            }
            ParagraphItem::Bookmark(mark) if mark.name == "w:bookmarkStart" => {
                if let Some(name) = mark.attr("w:name") {
                    let _ = write!(html, "<a id=\"{}\"></a>", escape(name));
                }
            }
            _ => {}
        }
    }
    if open_link.is_some() {
        html.push_str("</a>");
    }
    let _ = writeln!(html, "</{tag}>");
}

fn heading_level(style: &str) -> Option<u8> {
    let level = style
        .strip_prefix("Heading")
        .or_else(|| style.strip_prefix("heading"))?
        .trim()
        .parse::<u8>()
        .ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn link_target(document: &Document, run: &Run<'_>) -> Option<String> {
    let link = run.hyperlink()?;
    if let Some(id) = link.rel_id() {
        return document
            .relationships()
            .external_target(id)
            .ok()
            .map(str::to_string);
    }
    link.anchor().map(|anchor| format!("#{anchor}"))
}

fn write_run(html: &mut String, document: &Document, run: &Run<'_>) {
    match run.kind() {
        RunKind::Image(images) => {
            for image in images {
                write_image(html, document, &image);
            }
        }
        RunKind::Text(_) => {
            let text = run.text();
            if text.is_empty() {
                return;
            }
            let formatting = TextFormatting::of(run);
            let mut open = Vec::new();
            let mut styles = Vec::new();
            if formatting.is_bold() {
                open.push("strong");
            }
            if formatting.is_italic() {
                open.push("em");
            }
            if formatting.is_underlined() {
                open.push("u");
            }
            if formatting.is_struck() {
                open.push("s");
            }
            if let Some(color) = formatting.color {
                styles.push(format!("color: #{color}"));
            }
            if let Some(size) = formatting.font_size {
                styles.push(format!("font-size: {size}pt"));
            }

            for tag in &open {
                let _ = write!(html, "<{tag}>");
            }
            if !styles.is_empty() {
                let _ = write!(html, "<span style=\"{}\">", styles.join("; "));
            }
            html.push_str(&escape(&text).replace('\n', "<br>"));
            if !styles.is_empty() {
                html.push_str("</span>");
            }
            for tag in open.iter().rev() {
                let _ = write!(html, "</{tag}>");
            }
        }
    }
}

fn write_image(html: &mut String, document: &Document, image: &ImageRef<'_>) {
    let Some(id) = image.embed_id() else {
        return;
    };
    let Ok(part) = document.relationships().part_name(id) else {
        return;
    };
    let Some(bytes) = document.part(&part) else {
        return;
    };
    let Ok(info) = drawing::identify(&part, bytes) else {
        log::debug!("skipping unreadable image {part} in HTML output");
        return;
    };
    let extent = drawing::extent(image)
        .ok()
        .flatten()
        .unwrap_or_else(|| info.native_extent());

    let _ = write!(
        html,
        "<img src=\"data:{};base64,{}\" style=\"width: {:.2}in; height: {:.2}in\" alt=\"{}\">",
        info.content_type(),
        STANDARD.encode(bytes),
        extent.width_inches(),
        extent.height_inches(),
        escape(image.description().unwrap_or_default())
    );
}

fn write_table(html: &mut String, document: &Document, table: &Table<'_>) {
    html.push_str("<table>\n");
    for row in table.cells() {
        html.push_str("<tr>");
        for cell in row {
            html.push_str("<td>");
            if let Some(cell) = cell {
                for paragraph in cell.paragraphs() {
                    write_paragraph(html, document, &paragraph);
                }
            }
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
