//! Package (zip) I/O and validation
//!
//! A `.docx` file is an OPC package: a zip archive of named parts plus a
//! `[Content_Types].xml` manifest. This module reads every part into memory,
//! validates the archive shape, and writes a package back out.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::relationships::{resolve_target, Relationships};
use crate::error::DocumentError;
use crate::markup::{self, ns, Element};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
pub const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Largest single part the loader accepts before asking for recovery.
pub const DEFAULT_PART_LIMIT: u64 = 512 * 1024 * 1024;

/// Every part of a package, keyed by part name without a leading slash.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::from_reader(Cursor::new(bytes), DEFAULT_PART_LIMIT)
    }

    pub fn from_reader<R: Read + Seek>(reader: R, part_limit: u64) -> Result<Self, DocumentError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = BTreeMap::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().trim_start_matches('/').to_string();
            if entry.size() > part_limit {
                return Err(DocumentError::PartTooLarge {
                    name,
                    size: entry.size(),
                    limit: part_limit,
                });
            }
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut content)?;
            parts.insert(name, content);
        }

        Ok(Package { parts })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name.trim_start_matches('/')).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name.trim_start_matches('/'))
    }

    pub fn insert(&mut self, name: impl Into<String>, content: Vec<u8>) {
        self.parts.insert(name.into(), content);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Parse an XML part into a tree.
    pub fn xml(&self, name: &str) -> Result<Element, DocumentError> {
        let bytes = self
            .get(name)
            .ok_or_else(|| DocumentError::MissingPart(name.to_string()))?;
        markup::parse(name, bytes)
    }

    /// First part name not yet taken of the form `{stem}{n}.{ext}`.
    pub fn unused_name(&self, stem: &str, ext: &str) -> String {
        (1..)
            .map(|n| format!("{stem}{n}.{ext}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| format!("{stem}.{ext}"))
    }

    /// Write the package as a zip archive, content types first.
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W, DocumentError> {
        let mut zip = ZipWriter::new(writer);

        let ordered = self
            .parts
            .iter()
            .filter(|(name, _)| name.as_str() == CONTENT_TYPES_PART)
            .chain(
                self.parts
                    .iter()
                    .filter(|(name, _)| name.as_str() != CONTENT_TYPES_PART),
            );
        for (name, content) in ordered {
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file(name.as_str(), options)?;
            zip.write_all(content)?;
        }

        Ok(zip.finish()?)
    }

    /// Make sure `[Content_Types].xml` covers every media extension in the
    /// package and carries an override for each of `overrides`.
    pub fn update_content_types(
        &mut self,
        defaults: &[(String, String)],
        overrides: &[(&str, &str)],
    ) -> Result<(), DocumentError> {
        let mut types = match self.xml(CONTENT_TYPES_PART) {
            Ok(types) => types,
            Err(DocumentError::MissingPart(_)) => {
                Element::new("Types").with_attr("xmlns", ns::CONTENT_TYPES)
            }
            Err(e) => return Err(e),
        };

        for (extension, content_type) in defaults {
            let known = types.children_named("Default").any(|d| {
                d.attr("Extension")
                    .is_some_and(|e| e.eq_ignore_ascii_case(extension))
            });
            if !known {
                types.push(
                    Element::new("Default")
                        .with_attr("Extension", extension.as_str())
                        .with_attr("ContentType", content_type.as_str()),
                );
            }
        }

        for (part, content_type) in overrides {
            let part_name = format!("/{}", part.trim_start_matches('/'));
            let known = types
                .children_named("Override")
                .any(|o| o.attr("PartName") == Some(part_name.as_str()));
            if !known {
                types.push(
                    Element::new("Override")
                        .with_attr("PartName", part_name)
                        .with_attr("ContentType", *content_type),
                );
            }
        }

        self.insert(CONTENT_TYPES_PART, markup::serialize(&types)?);
        Ok(())
    }
}

/// Validates that the file is a legitimate .docx file
pub(crate) fn validate_docx_file(file_path: &Path) -> Result<()> {
    // Check file extension
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    if !extension.eq_ignore_ascii_case("docx") {
        bail!(
            "Invalid file format. Expected .docx file, got .{}\n\
            Note: only Word .docx files can be merged (not .doc, .xlsx, .zip, etc.)",
            extension
        );
    }

    // Check ZIP structure contains the main document part
    let file = File::open(file_path)?;
    let mut archive = ZipArchive::new(file)?;
    let main_part = main_part_name(&mut archive);

    if archive.by_name(&main_part).is_err() {
        // Check if it might be an Excel file
        if archive.by_name("xl/workbook.xml").is_ok() {
            bail!(
                "This appears to be an Excel file (.xlsx).\n\
                Only Word documents (.docx) can be merged."
            );
        }

        bail!(
            "Invalid .docx file: missing {main_part}\n\
            This file may be corrupted or is not a valid Word document."
        );
    }

    Ok(())
}

/// Main document part named by the package relationships, or
/// `word/document.xml` when the archive does not say.
fn main_part_name<R: Read + Seek>(archive: &mut ZipArchive<R>) -> String {
    let mut bytes = Vec::new();
    let read = archive
        .by_name(PACKAGE_RELS_PART)
        .map_err(anyhow::Error::from)
        .and_then(|part| Ok(part.take(DEFAULT_PART_LIMIT).read_to_end(&mut bytes)?));
    if read.is_err() {
        return DEFAULT_MAIN_PART.to_string();
    }
    markup::parse(PACKAGE_RELS_PART, &bytes)
        .ok()
        .and_then(|root| {
            Relationships::parse("", &root)
                .first_of_type(ns::rel::OFFICE_DOCUMENT)
                .map(|rel| resolve_target("", &rel.target))
        })
        .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package_with(parts: &[(&str, &str)]) -> Package {
        let mut package = Package::default();
        for (name, content) in parts {
            package.insert(*name, content.as_bytes().to_vec());
        }
        package
    }

    #[test]
    fn test_write_then_read_keeps_parts() {
        let package = package_with(&[
            ("word/document.xml", "<w:document/>"),
            (CONTENT_TYPES_PART, "<Types/>"),
        ]);
        let written = package.write(Cursor::new(Vec::new())).unwrap().into_inner();

        let read = Package::from_bytes(&written).unwrap();
        assert_eq!(read.get("word/document.xml"), Some(&b"<w:document/>"[..]));
        assert_eq!(read.get("/[Content_Types].xml"), Some(&b"<Types/>"[..]));
    }

    #[test]
    fn test_part_limit_triggers_too_large() {
        let package = package_with(&[("word/document.xml", "<w:document>0123456789</w:document>")]);
        let written = package.write(Cursor::new(Vec::new())).unwrap().into_inner();

        let err = Package::from_reader(Cursor::new(written), 8).unwrap_err();
        assert!(matches!(err, DocumentError::PartTooLarge { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_content_types_gain_media_defaults_once() {
        let mut package = package_with(&[(
            CONTENT_TYPES_PART,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#,
        )]);
        let defaults = vec![("png".to_string(), "image/png".to_string())];
        package.update_content_types(&defaults, &[]).unwrap();
        package.update_content_types(&defaults, &[]).unwrap();

        let types = package.xml(CONTENT_TYPES_PART).unwrap();
        assert_eq!(
            types
                .children_named("Default")
                .filter(|d| d.attr("Extension") == Some("png"))
                .count(),
            1
        );
    }

    fn write_docx(dir: &Path, main_part: &str, rels_target: &str) -> std::path::PathBuf {
        let rels = format!(
            r#"<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}" Target="{rels_target}"/></Relationships>"#,
            ns::PACKAGE_RELATIONSHIPS,
            ns::rel::OFFICE_DOCUMENT
        );
        let package = package_with(&[
            (CONTENT_TYPES_PART, "<Types/>"),
            (PACKAGE_RELS_PART, rels.as_str()),
            (main_part, "<w:document/>"),
        ]);
        let path = dir.join("report.docx");
        let file = File::create(&path).unwrap();
        package.write(file).unwrap();
        path
    }

    #[test]
    fn test_validation_follows_package_relationships() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_docx(dir.path(), "word/document2.xml", "/word/document2.xml");
        validate_docx_file(&path).unwrap();

        let path = write_docx(dir.path(), "word/document.xml", "word/missing.xml");
        let err = validate_docx_file(&path).unwrap_err();
        assert!(err.to_string().contains("word/missing.xml"), "{err}");
    }

    #[test]
    fn test_unused_name_skips_taken_parts() {
        let package = package_with(&[("word/media/image1.png", "")]);
        assert_eq!(package.unused_name("word/media/image", "png"), "word/media/image2.png");
    }
}
