//! Document loading with office-suite recovery
//!
//! `load_document()` validates and parses a source file. Packages that fail
//! with a size or markup error get one more chance: they are resaved through
//! LibreOffice in a temporary directory and the resaved copy is parsed.

use anyhow::{bail, Context, Result};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::models::Document;
use super::package::{validate_docx_file, Package, DEFAULT_PART_LIMIT};

/// Binary used for the recovery resave.
pub const RECOVERY_PROGRAM: &str = "libreoffice";

/// Options controlling how sources are loaded
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub recover: bool,
    pub recovery_timeout: Duration,
    pub part_limit: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            recover: true,
            recovery_timeout: Duration::from_secs(180),
            part_limit: DEFAULT_PART_LIMIT,
        }
    }
}

/// Load a source document, recovering it through an office suite if needed.
pub async fn load_document(file_path: &Path, options: &LoadOptions) -> Result<Document> {
    // Validate file type before attempting to parse
    validate_docx_file(file_path)?;

    let bytes = tokio::fs::read(file_path)
        .await
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    match parse(&bytes, options.part_limit) {
        Ok(document) => Ok(titled(document, file_path)),
        Err(e) if options.recover && e.is_recoverable() => {
            log::warn!(
                "{} could not be parsed ({e}); attempting recovery via {RECOVERY_PROGRAM}",
                file_path.display()
            );
            let document = recover(file_path, options).await.with_context(|| {
                format!("Recovery of {} failed after: {e}", file_path.display())
            })?;
            log::info!("Loaded resaved copy of {}", file_path.display());
            Ok(titled(document, file_path))
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to load {}", file_path.display()))
        }
    }
}

fn parse(bytes: &[u8], part_limit: u64) -> Result<Document, crate::error::DocumentError> {
    Document::from_package(Package::from_reader(Cursor::new(bytes), part_limit)?)
}

fn titled(mut document: Document, file_path: &Path) -> Document {
    document.title = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled Document")
        .to_string();
    document
}

async fn recover(file_path: &Path, options: &LoadOptions) -> Result<Document> {
    let workdir = tempfile::tempdir().context("Failed to create recovery directory")?;
    let resaved = resave(file_path, workdir.path(), options.recovery_timeout).await?;
    let bytes = tokio::fs::read(&resaved).await?;
    // The resaved copy is trusted to be sane, so no part limit applies
    Ok(parse(&bytes, u64::MAX)?)
}

/// Resave `input` as `.docx` into `outdir` and return the new file's path.
pub(crate) async fn resave(input: &Path, outdir: &Path, limit: Duration) -> Result<PathBuf> {
    let mut command = Command::new(RECOVERY_PROGRAM);
    command
        .args(["--headless", "--convert-to", "docx", "--outdir"])
        .arg(outdir)
        .arg(input)
        .kill_on_drop(true);

    let output = match tokio::time::timeout(limit, command.output()).await {
        Ok(output) => output.with_context(|| format!("Failed to run {RECOVERY_PROGRAM}"))?,
        Err(_) => bail!("{RECOVERY_PROGRAM} timed out after {}s", limit.as_secs()),
    };
    if !output.status.success() {
        bail!(
            "{RECOVERY_PROGRAM} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let file_name = input
        .file_name()
        .context("Recovery input has no file name")?;
    let resaved = outdir.join(file_name);
    if !resaved.exists() {
        bail!("{RECOVERY_PROGRAM} did not produce {}", resaved.display());
    }
    Ok(resaved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_docx_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = load_document(&path, &LoadOptions::default()).await.unwrap_err();
        assert!(err.to_string().contains("Expected .docx"));
    }

    #[tokio::test]
    async fn test_loads_blank_document_with_file_stem_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.docx");
        Document::blank().unwrap().save(&path).unwrap();

        let document = load_document(&path, &LoadOptions::default()).await.unwrap();
        assert_eq!(document.title, "blank");
    }

    #[tokio::test]
    async fn test_unrecoverable_error_skips_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"PK not really a zip").unwrap();

        let options = LoadOptions {
            recover: true,
            ..LoadOptions::default()
        };
        assert!(load_document(&path, &options).await.is_err());
    }
}
