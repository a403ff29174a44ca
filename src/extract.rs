//! Side extraction of embedded media
//!
//! Every `word/media/*` entry of a source archive is written out under
//! `extracted_images/<source stem>/`. Extraction never affects the merge:
//! failures are logged and the count of written files is returned.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Directory created next to the merged output.
pub const EXTRACT_DIR: &str = "extracted_images";

const MEDIA_PREFIX: &str = "word/media/";

/// Something that can list the media payloads of a source archive.
pub trait MediaExtractor {
    fn extract(&self, archive: &Path) -> Result<Vec<(String, Vec<u8>)>>;
}

/// Reads media entries straight out of the zip package.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipMediaExtractor;

impl MediaExtractor for ZipMediaExtractor {
    fn extract(&self, archive: &Path) -> Result<Vec<(String, Vec<u8>)>> {
        let file = File::open(archive)
            .with_context(|| format!("Failed to open {}", archive.display()))?;
        let mut zip = ZipArchive::new(file)?;

        let mut media = Vec::new();
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let Some(name) = entry.name().strip_prefix(MEDIA_PREFIX).map(str::to_string) else {
                continue;
            };
            // Nested folders or traversal components are not media we write out
            if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
                continue;
            }
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            media.push((name, bytes));
        }
        Ok(media)
    }
}

/// Where the media of `source` is written under `output_dir`.
pub fn extraction_dir(output_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    output_dir.join(EXTRACT_DIR).join(stem)
}

/// Best-effort extraction of one source. Returns the number of files written.
pub fn extract_media(extractor: &dyn MediaExtractor, source: &Path, output_dir: &Path) -> usize {
    match try_extract(extractor, source, output_dir) {
        Ok(written) => {
            if written > 0 {
                log::info!("extracted {written} media file(s) from {}", source.display());
            }
            written
        }
        Err(e) => {
            log::warn!("media extraction from {} failed: {e:#}", source.display());
            0
        }
    }
}

fn try_extract(extractor: &dyn MediaExtractor, source: &Path, output_dir: &Path) -> Result<usize> {
    let media = extractor.extract(source)?;
    if media.is_empty() {
        return Ok(0);
    }
    let target = extraction_dir(output_dir, source);
    std::fs::create_dir_all(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;

    let mut written = 0;
    for (name, bytes) in media {
        let path = target.join(&name);
        match std::fs::write(&path, bytes) {
            Ok(()) => written += 1,
            Err(e) => log::warn!("could not write {}: {e}", path.display()),
        }
    }
    Ok(written)
}
