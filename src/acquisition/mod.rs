pub mod blocks;
pub mod chromium;
pub mod markdown;
pub mod pruning;
pub mod render;
pub mod spider;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use pruning::{PruneConfig, PruningFilter};
use render::{PageRenderer, RenderOptions};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to render {url}: {reason}")]
    Render { url: String, reason: String },

    #[error("no usable content at {url}")]
    NoContent { url: String },
}

/// Both renderings of a page's text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    /// Density-filtered markdown; `None` when no block survived.
    pub fit_text: Option<String>,
    /// Every block, unfiltered.
    pub raw_text: String,
}

impl ExtractedContent {
    /// Fit text if non-empty, else raw text if non-empty.
    pub fn document_text(&self) -> Option<&str> {
        self.fit_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(self.raw_text.as_str()).filter(|t| !t.trim().is_empty()))
    }
}

/// Markup → blocks → (fit, raw).
pub fn extract(html: &str, filter: &PruningFilter) -> ExtractedContent {
    let all = blocks::extract_blocks(html);
    let kept = filter.prune(&all);
    let fit = markdown::render(&kept);
    ExtractedContent {
        fit_text: if fit.is_empty() { None } else { Some(fit) },
        raw_text: markdown::render(&all),
    }
}

/// Turns a URL into document text. Holds no per-request state, so one
/// instance serves any number of concurrent fetches.
pub struct Crawler {
    renderer: Arc<dyn PageRenderer>,
    options: RenderOptions,
    filter: PruningFilter,
}

impl Crawler {
    pub fn new(renderer: Arc<dyn PageRenderer>, options: RenderOptions, prune: PruneConfig) -> Self {
        Crawler {
            renderer,
            options,
            filter: PruningFilter::new(prune),
        }
    }

    /// Render `url` and extract its text. Succeeds only with non-empty
    /// document text; nothing is retried.
    pub async fn fetch(&self, url: &str) -> Result<ExtractedContent, FetchError> {
        let url = validate_url(url)?;

        let page = self.renderer.render(url.as_str(), &self.options).await;
        if !page.success {
            let reason = page
                .error_message
                .unwrap_or_else(|| "renderer reported failure".to_string());
            warn!(url = %url, renderer = self.renderer.name(), "Error crawling: {}", reason);
            return Err(FetchError::Render {
                url: url.to_string(),
                reason,
            });
        }

        // Parsed HTML is not Send; keep it off the await points.
        let content = extract(&page.html, &self.filter);
        let Some(text) = content.document_text() else {
            warn!(url = %url, "Rendered page has no usable text");
            return Err(FetchError::NoContent {
                url: url.to_string(),
            });
        };

        info!(
            url = %page.url,
            renderer = self.renderer.name(),
            elapsed_ms = page.elapsed_ms,
            chars = text.len(),
            fit = content.fit_text.is_some(),
            "Successfully crawled"
        );
        Ok(content)
    }
}

fn validate_url(raw: &str) -> Result<url::Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty".to_string()));
    }
    let parsed = url::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::render::RenderedPage;
    use super::*;

    /// Serves canned HTML, or a failure, and counts calls.
    pub(crate) struct FakeRenderer {
        pub html: Option<String>,
        pub calls: AtomicUsize,
    }

    impl FakeRenderer {
        pub(crate) fn serving(html: &str) -> Self {
            FakeRenderer {
                html: Some(html.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            FakeRenderer {
                html: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn render(&self, url: &str, _options: &RenderOptions) -> RenderedPage {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.html {
                Some(html) => RenderedPage::rendered(url, html.clone(), 1),
                None => RenderedPage::failed(url, "net::ERR_NAME_NOT_RESOLVED", 1),
            }
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    pub(crate) fn options() -> RenderOptions {
        RenderOptions {
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout_ms: 1_000,
            image_wait_ms: 1_000,
        }
    }

    pub(crate) fn crawler(renderer: Arc<FakeRenderer>) -> Crawler {
        Crawler::new(renderer, options(), PruneConfig::default())
    }

    #[test]
    fn fit_preferred_over_raw() {
        let content = ExtractedContent {
            fit_text: Some("fit".into()),
            raw_text: "raw".into(),
        };
        assert_eq!(content.document_text(), Some("fit"));
    }

    #[test]
    fn raw_used_when_fit_missing_or_blank() {
        let missing = ExtractedContent {
            fit_text: None,
            raw_text: "raw".into(),
        };
        assert_eq!(missing.document_text(), Some("raw"));

        let blank = ExtractedContent {
            fit_text: Some("  \n".into()),
            raw_text: "raw".into(),
        };
        assert_eq!(blank.document_text(), Some("raw"));
    }

    #[test]
    fn nothing_when_both_empty() {
        let content = ExtractedContent {
            fit_text: None,
            raw_text: " ".into(),
        };
        assert_eq!(content.document_text(), None);
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(matches!(validate_url(""), Err(FetchError::InvalidUrl { .. })));
        assert!(matches!(validate_url("   "), Err(FetchError::InvalidUrl { .. })));
        assert!(matches!(validate_url("example.com"), Err(FetchError::InvalidUrl { .. })));
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn short_page_falls_back_to_raw() {
        let renderer = Arc::new(FakeRenderer::serving(
            "<html><body><p>Short notice: site under maintenance.</p></body></html>",
        ));
        let content = crawler(renderer).fetch("https://example.com").await.unwrap();
        assert_eq!(content.fit_text, None);
        assert_eq!(
            content.document_text(),
            Some("Short notice: site under maintenance.")
        );
    }

    #[tokio::test]
    async fn empty_page_is_no_content() {
        let renderer = Arc::new(FakeRenderer::serving(
            "<html><body><script>init()</script><img src=a.png></body></html>",
        ));
        let err = crawler(renderer).fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::NoContent { .. }));
    }

    #[tokio::test]
    async fn render_failure_carries_message() {
        let renderer = Arc::new(FakeRenderer::failing());
        let err = crawler(renderer.clone())
            .fetch("https://example.invalid")
            .await
            .unwrap_err();
        match err {
            FetchError::Render { reason, .. } => assert!(reason.contains("ERR_NAME_NOT_RESOLVED")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_url_never_renders() {
        let renderer = Arc::new(FakeRenderer::serving("<p>x</p>"));
        let err = crawler(renderer.clone()).fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fixture_fit_text_is_article_body() {
        let html = std::fs::read_to_string("tests/fixtures/article.html").unwrap();
        let renderer = Arc::new(FakeRenderer::serving(&html));
        let content = crawler(renderer).fetch("https://example.com/story").await.unwrap();

        let fit = content.fit_text.as_deref().unwrap();
        assert!(fit.contains("tidal turbines"));
        assert!(fit.contains("[control software](https://example.org/report.pdf)"));
        assert!(fit.contains("> We expected"));
        assert!(!fit.contains("All rights reserved"));
        assert!(!fit.contains("turbine.jpg"));
        assert!(content.raw_text.contains("All rights reserved"));
        assert!(content.raw_text.len() > fit.len());
    }
}
