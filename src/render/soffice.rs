//! LibreOffice headless conversion

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use super::{RenderTimeouts, Renderer};

pub const SOFFICE_PROGRAM: &str = "soffice";

#[derive(Debug, Clone)]
pub struct SofficeRenderer {
    timeout: Duration,
}

impl Default for SofficeRenderer {
    fn default() -> Self {
        Self::new(RenderTimeouts::default().soffice)
    }
}

impl SofficeRenderer {
    pub fn new(timeout: Duration) -> Self {
        SofficeRenderer { timeout }
    }
}

#[async_trait]
impl Renderer for SofficeRenderer {
    fn name(&self) -> &'static str {
        SOFFICE_PROGRAM
    }

    fn is_available(&self) -> bool {
        which::which(SOFFICE_PROGRAM).is_ok()
    }

    async fn render(&self, input: &Path, output: &Path) -> Result<()> {
        // soffice names its output after the input, so convert in a scratch
        // directory and move the result into place
        let workdir = tempfile::tempdir().context("Failed to create conversion directory")?;
        let mut command = Command::new(SOFFICE_PROGRAM);
        command
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(workdir.path())
            .arg(input)
            .kill_on_drop(true);

        let result = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.context("Failed to execute LibreOffice (soffice)")?,
            Err(_) => bail!("LibreOffice timed out after {}s", self.timeout.as_secs()),
        };
        if !result.status.success() {
            bail!(
                "LibreOffice conversion failed: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            );
        }

        let stem = input
            .file_stem()
            .context("Conversion input has no file name")?;
        let produced = workdir
            .path()
            .join(format!("{}.pdf", stem.to_string_lossy()));
        if !produced.exists() {
            bail!("PDF not generated at {}", produced.display());
        }
        tokio::fs::copy(&produced, output)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        Ok(())
    }
}
