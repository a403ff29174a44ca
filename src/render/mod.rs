//! PDF rendering of the merged document
//!
//! Renderers are tried in priority order and the first success wins. Each
//! one looks up on `PATH` the external program it drives.

pub mod html;
pub mod soffice;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub use html::{document_to_html, HtmlRenderer};
pub use soffice::SofficeRenderer;

use crate::ConverterKind;

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short name used in logs and the summary.
    fn name(&self) -> &'static str;

    /// True when the external program this renderer needs is on `PATH`.
    fn is_available(&self) -> bool;

    /// Render the `.docx` at `input` into a PDF at `output`.
    async fn render(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Renderers in the order they are attempted.
pub struct RenderChain {
    renderers: Vec<Box<dyn Renderer>>,
}

impl RenderChain {
    pub fn new(renderers: Vec<Box<dyn Renderer>>) -> Self {
        RenderChain { renderers }
    }

    /// The chain for a converter choice. `Auto` tries LibreOffice first and
    /// falls back to the HTML route.
    pub fn for_kind(kind: ConverterKind, timeouts: &RenderTimeouts) -> Self {
        let soffice = || Box::new(SofficeRenderer::new(timeouts.soffice)) as Box<dyn Renderer>;
        let html = || Box::new(HtmlRenderer::new(timeouts.html)) as Box<dyn Renderer>;
        match kind {
            ConverterKind::Auto => Self::new(vec![soffice(), html()]),
            ConverterKind::Soffice => Self::new(vec![soffice()]),
            ConverterKind::Html => Self::new(vec![html()]),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    /// Render with the first available renderer that succeeds and return
    /// its name.
    pub async fn render(&self, input: &Path, output: &Path) -> Result<&'static str> {
        let mut failures = Vec::new();
        for renderer in &self.renderers {
            if !renderer.is_available() {
                log::debug!("{} is not available", renderer.name());
                continue;
            }
            match renderer.render(input, output).await {
                Ok(()) => return Ok(renderer.name()),
                Err(e) => {
                    log::warn!("{} failed: {e:#}", renderer.name());
                    failures.push(format!("{}: {e}", renderer.name()));
                }
            }
        }
        if failures.is_empty() {
            bail!("No PDF converter available (install LibreOffice or wkhtmltopdf)");
        }
        bail!("All PDF converters failed: {}", failures.join("; "))
    }
}

/// Per-renderer time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTimeouts {
    pub soffice: Duration,
    pub html: Duration,
}

impl Default for RenderTimeouts {
    fn default() -> Self {
        RenderTimeouts {
            soffice: Duration::from_secs(600),
            html: Duration::from_secs(300),
        }
    }
}

/// Which converter route would be used right now.
pub fn detect_converter() -> &'static str {
    if SofficeRenderer::default().is_available() {
        "soffice"
    } else if HtmlRenderer::default().is_available() {
        "html+wkhtmltopdf"
    } else {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fake {
        name: &'static str,
        available: bool,
        succeeds: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Renderer for Fake {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn render(&self, _input: &Path, _output: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeeds {
                Ok(())
            } else {
                bail!("boom")
            }
        }
    }

    fn fake(name: &'static str, available: bool, succeeds: bool, calls: &Arc<AtomicUsize>) -> Box<dyn Renderer> {
        Box::new(Fake {
            name,
            available,
            succeeds,
            calls: Arc::clone(calls),
        })
    }

    #[tokio::test]
    async fn test_first_success_wins_after_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = RenderChain::new(vec![
            fake("missing", false, true, &calls),
            fake("broken", true, false, &calls),
            fake("works", true, true, &calls),
            fake("never", true, true, &calls),
        ]);
        let used = chain.render(Path::new("in.docx"), Path::new("out.pdf")).await.unwrap();
        assert_eq!(used, "works");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_available_renderer_is_an_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = RenderChain::new(vec![fake("missing", false, true, &calls)]);
        let err = chain.render(Path::new("in.docx"), Path::new("out.pdf")).await.unwrap_err();
        assert!(err.to_string().contains("No PDF converter"));
    }

    #[test]
    fn test_chain_order_for_kind() {
        let timeouts = RenderTimeouts::default();
        assert_eq!(
            RenderChain::for_kind(ConverterKind::Auto, &timeouts).names(),
            vec!["soffice", "html+wkhtmltopdf"]
        );
        assert_eq!(
            RenderChain::for_kind(ConverterKind::Html, &timeouts).names(),
            vec!["html+wkhtmltopdf"]
        );
    }
}
