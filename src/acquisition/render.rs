//! Page-rendering capability.
//!
//! Every rendering backend is adapted to the single [`RenderedPage`] shape,
//! so block extraction and filtering never see provider-specific results.

use async_trait::async_trait;

/// Fixed per-process rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Upper bound for the navigation itself.
    pub navigation_timeout_ms: u64,
    /// Upper bound for waiting on pending images after navigation.
    pub image_wait_ms: u64,
}

/// Outcome of rendering one URL. Owned by a single fetch and dropped after
/// extraction.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub success: bool,
    pub html: String,
    pub error_message: Option<String>,
    pub elapsed_ms: u64,
}

impl RenderedPage {
    pub fn rendered(url: &str, html: String, elapsed_ms: u64) -> Self {
        RenderedPage {
            url: url.to_string(),
            success: true,
            html,
            error_message: None,
            elapsed_ms,
        }
    }

    pub fn failed(url: &str, message: impl Into<String>, elapsed_ms: u64) -> Self {
        RenderedPage {
            url: url.to_string(),
            success: false,
            html: String::new(),
            error_message: Some(message.into()),
            elapsed_ms,
        }
    }
}

/// A rendering backend.
///
/// Implementations must give each call its own browser state and release it
/// before returning, whether or not rendering succeeded. Failures are reported
/// through [`RenderedPage::failed`] rather than an error value.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, options: &RenderOptions) -> RenderedPage;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}
