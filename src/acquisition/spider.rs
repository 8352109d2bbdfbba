//! spider.cloud renderer. The page is rendered remotely; each request is an
//! independent crawl with no shared browser state.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use spider_client::shapes::request::{
    IdleNetwork, RequestType, ReturnFormat, ReturnFormatHandling, Timeout, Viewport, WaitFor,
};
use spider_client::{RequestParams, Spider};

use super::render::{PageRenderer, RenderOptions, RenderedPage};

/// The service caps waits at one minute.
const MAX_WAIT: Duration = Duration::from_secs(60);

pub struct SpiderRenderer {
    spider: Spider,
}

impl SpiderRenderer {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = api_key.context("SPIDER_API_KEY must be set for the spider renderer")?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| anyhow::anyhow!("Failed to create Spider client: {}", e))?;
        Ok(Self { spider })
    }

    async fn scrape(&self, url: &str, options: &RenderOptions) -> Result<String> {
        let response = self
            .spider
            .scrape_url(url, Some(request_params(options)), "application/json")
            .await
            .map_err(|e| anyhow::anyhow!("Spider scrape failed: {}", e))?;

        page_content(response)
    }
}

#[async_trait]
impl PageRenderer for SpiderRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> RenderedPage {
        let start = Instant::now();
        let result = self.scrape(url, options).await;
        let elapsed = start.elapsed().as_millis() as u64;
        match result {
            Ok(html) => RenderedPage::rendered(url, html, elapsed),
            Err(e) => RenderedPage::failed(url, format!("{e:#}"), elapsed),
        }
    }

    fn name(&self) -> &'static str {
        "spider"
    }
}

/// Browser render at the configured viewport, cache bypassed, waiting for
/// the network (images included) to go idle within the image budget.
fn request_params(options: &RenderOptions) -> RequestParams {
    let idle = Duration::from_millis(options.image_wait_ms).min(MAX_WAIT);
    let navigation_secs = options.navigation_timeout_ms.div_ceil(1000).clamp(1, u8::MAX as u64);

    RequestParams {
        request: Some(RequestType::Browser),
        return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
        cache: Some(false),
        viewport: Some(Viewport {
            width: options.viewport_width,
            height: options.viewport_height,
            ..Default::default()
        }),
        wait_for: Some(WaitFor {
            idle_network: Some(IdleNetwork {
                timeout: Timeout {
                    secs: idle.as_secs(),
                    nanos: idle.subsec_nanos(),
                },
            }),
            ..Default::default()
        }),
        request_timeout: Some(navigation_secs as u8),
        ..Default::default()
    }
}

/// Pull the page body out of a spider response: a JSON array (sometimes
/// delivered as a JSON string) whose first entry carries `content`, `status`
/// and `error`.
fn page_content(response: serde_json::Value) -> Result<String> {
    let parsed: serde_json::Value = match response.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
        None => response,
    };

    let first = parsed
        .as_array()
        .and_then(|arr| arr.first())
        .ok_or_else(|| anyhow::anyhow!("Empty spider response"))?;

    if let Some(err) = first.get("error").and_then(|e| e.as_str()) {
        if !err.is_empty() {
            anyhow::bail!("Spider reported: {}", err);
        }
    }
    if let Some(status) = first.get("status").and_then(|s| s.as_i64()) {
        if status >= 400 {
            anyhow::bail!("Page returned HTTP {}", status);
        }
    }

    first
        .get("content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No content in spider response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_from_array() {
        let v = json!([{ "content": "<p>hi</p>", "status": 200 }]);
        assert_eq!(page_content(v).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn content_from_stringified_array() {
        let v = json!(r#"[{"content":"<p>hi</p>","status":200}]"#);
        assert_eq!(page_content(v).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn http_error_status() {
        let v = json!([{ "content": "Not found", "status": 404 }]);
        let err = page_content(v).unwrap_err().to_string();
        assert!(err.contains("404"), "{err}");
    }

    #[test]
    fn reported_error() {
        let v = json!([{ "content": null, "error": "timeout", "status": 0 }]);
        assert!(page_content(v).unwrap_err().to_string().contains("timeout"));
    }

    #[test]
    fn missing_content() {
        assert!(page_content(json!([])).is_err());
        assert!(page_content(json!([{ "status": 200 }])).is_err());
    }

    #[test]
    fn params_follow_render_options() {
        let params = request_params(&RenderOptions {
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout_ms: 30_000,
            image_wait_ms: 2_500,
        });

        assert_eq!(params.cache, Some(false));
        assert!(matches!(params.request, Some(RequestType::Browser)));
        let viewport = params.viewport.unwrap();
        assert_eq!((viewport.width, viewport.height), (1280, 720));
        let idle = params.wait_for.unwrap().idle_network.unwrap().timeout;
        assert_eq!((idle.secs, idle.nanos), (2, 500_000_000));
        assert_eq!(params.request_timeout, Some(30));
    }

    #[test]
    fn waits_are_capped() {
        let params = request_params(&RenderOptions {
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout_ms: 600_000,
            image_wait_ms: 300_000,
        });
        let idle = params.wait_for.unwrap().idle_network.unwrap().timeout;
        assert_eq!(idle.secs, 60);
        assert_eq!(params.request_timeout, Some(255));
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(SpiderRenderer::new(None).is_err());
    }
}
