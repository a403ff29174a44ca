//! Fixture builder for integration tests
//!
//! Packs WordprocessingML strings into in-memory `.docx` packages.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use docxmerge::Document;
use image::{ImageFormat, Rgb, RgbImage};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    relationships: Vec<(String, String, String, bool)>,
    media: Vec<(String, Vec<u8>)>,
    styles: Vec<String>,
    title: Option<String>,
    author: Option<String>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw body markup (paragraphs, tables).
    pub fn body(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    pub fn paragraph(self, text: &str) -> Self {
        let xml = format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>");
        self.body(&xml)
    }

    pub fn hyperlink_rel(mut self, id: &str, url: &str) -> Self {
        self.relationships
            .push((id.to_string(), "hyperlink".to_string(), url.to_string(), true));
        self
    }

    /// Store `bytes` as `word/media/<name>` behind relationship `id`.
    pub fn image_rel(mut self, id: &str, name: &str, bytes: Vec<u8>) -> Self {
        self.relationships
            .push((id.to_string(), "image".to_string(), format!("media/{name}"), false));
        self.media.push((name.to_string(), bytes));
        self
    }

    pub fn style(mut self, style_id: &str) -> Self {
        self.styles.push(style_id.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut put = |name: &str, content: &[u8]| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content).unwrap();
        };

        put(
            "[Content_Types].xml",
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#,
        );
        put(
            "_rels/.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{REL_NS}">
<Relationship Id="rId1" Type="{REL_TYPE}/officeDocument" Target="word/document.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#
            )
            .as_bytes(),
        );
        put(
            "word/document.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr></w:body></w:document>"#,
                self.body
            )
            .as_bytes(),
        );

        let mut rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{REL_NS}"><Relationship Id="rIdStyles" Type="{REL_TYPE}/styles" Target="styles.xml"/>"#
        );
        for (id, kind, target, external) in &self.relationships {
            let mode = if *external { r#" TargetMode="External""# } else { "" };
            rels.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{REL_TYPE}/{kind}" Target="{target}"{mode}/>"#
            ));
        }
        rels.push_str("</Relationships>");
        put("word/_rels/document.xml.rels", rels.as_bytes());

        let styles: String = self
            .styles
            .iter()
            .map(|id| format!(r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{id}"/></w:style>"#))
            .collect();
        put(
            "word/styles.xml",
            format!(r#"<w:styles xmlns:w="{W_NS}">{styles}</w:styles>"#).as_bytes(),
        );

        let field = |name: &str, value: &Option<String>| {
            value
                .as_ref()
                .map(|v| format!("<{name}>{v}</{name}>"))
                .unwrap_or_default()
        };
        put(
            "docProps/core.xml",
            format!(
                r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">{}{}</cp:coreProperties>"#,
                field("dc:title", &self.title),
                field("dc:creator", &self.author)
            )
            .as_bytes(),
        );

        for (name, bytes) in &self.media {
            put(&format!("word/media/{name}"), bytes);
        }

        zip.finish().unwrap().into_inner()
    }

    pub fn document(&self, title: &str) -> Document {
        let mut document = Document::from_bytes(&self.build()).unwrap();
        document.title = title.to_string();
        document
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

/// A solid-colour PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// A run holding one inline picture with the given extent in EMU.
pub fn image_run(rel_id: &str, cx: i64, cy: i64) -> String {
    inline_image(rel_id, Some((cx, cy)), "1")
}

/// A run holding one inline picture, optionally without `wp:extent`, whose
/// `wp:docPr` carries `doc_pr_id` verbatim.
pub fn inline_image(rel_id: &str, extent: Option<(i64, i64)>, doc_pr_id: &str) -> String {
    let (wp_extent, xfrm_ext) = match extent {
        Some((cx, cy)) => (
            format!(r#"<wp:extent cx="{cx}" cy="{cy}"/>"#),
            format!(r#"<a:ext cx="{cx}" cy="{cy}"/>"#),
        ),
        None => (String::new(), String::new()),
    };
    format!(
        r#"<w:r><w:drawing><wp:inline>{wp_extent}<wp:docPr id="{doc_pr_id}" name="Picture 1" descr="chart"/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:nvPicPr><pic:cNvPr id="0" name="image.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/>{xfrm_ext}</a:xfrm><a:prstGeom prst="rect"/></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
    )
}
