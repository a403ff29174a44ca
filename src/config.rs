use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::LoadOptions;
use crate::merge::MergeOptions;
use crate::render::RenderTimeouts;

/// Merge configuration for docxmerge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// File name (without extension) of the merged document and PDF
    pub output_stem: String,
    /// Copy each source's embedded media into `extracted_images/`
    pub extract_images: bool,
    pub contents_page: bool,
    pub source_bookmarks: bool,
    /// Render the merged document to PDF
    pub render: bool,
    pub timeouts: Timeouts,
}

/// External program time limits, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub recovery: u64,
    pub soffice: u64,
    pub html: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            output_stem: "Merged_Doc".to_string(),
            extract_images: true,
            contents_page: false,
            source_bookmarks: false,
            render: true,
            timeouts: Timeouts::default(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            recovery: 180,
            soffice: 600,
            html: 300,
        }
    }
}

impl MergeConfig {
    /// Load config from the config directory
    pub fn load() -> Result<Self> {
        match Self::get_config_path() {
            Some(config_path) => Self::load_from(&config_path),
            None => Ok(MergeConfig::default()),
        }
    }

    /// Load config from `path`, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(MergeConfig::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: MergeConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the config directory
    pub fn save(&self) -> Result<Option<PathBuf>> {
        let Some(config_path) = Self::get_config_path() else {
            return Ok(None);
        };
        self.save_to(&config_path)?;
        Ok(Some(config_path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docxmerge").join("config.toml"))
    }

    /// Initialize default config file
    pub fn init_default() -> Result<Option<PathBuf>> {
        MergeConfig::default().save()
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            source_bookmarks: self.source_bookmarks,
            contents_page: self.contents_page,
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            recovery_timeout: Duration::from_secs(self.timeouts.recovery),
            ..LoadOptions::default()
        }
    }

    pub fn render_timeouts(&self) -> RenderTimeouts {
        RenderTimeouts {
            soffice: Duration::from_secs(self.timeouts.soffice),
            html: Duration::from_secs(self.timeouts.html),
        }
    }
}
