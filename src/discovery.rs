//! Source discovery
//!
//! Finds the `.docx` files directly inside the merge directory, sorted by
//! file name so the merge order is stable.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Prefix Word uses for its lock files while a document is open.
const LOCK_FILE_PREFIX: &str = "~$";

pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Merge directory not found: {}", dir.display());
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_docx(entry.path()) {
            continue;
        }
        sources.push(entry.into_path());
    }
    Ok(sources)
}

fn is_docx(path: &Path) -> bool {
    let named_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with(LOCK_FILE_PREFIX));
    let docx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    named_ok && docx
}
