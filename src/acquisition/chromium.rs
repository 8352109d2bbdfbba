//! Headless Chromium renderer using chromiumoxide.
//!
//! Each call launches its own browser with a throwaway profile directory, so
//! cookies, storage and cache never carry over between pages.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetCacheDisabledParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

use super::render::{PageRenderer, RenderOptions, RenderedPage};

/// Resolves once every `<img>` has loaded or failed.
const WAIT_FOR_IMAGES_JS: &str = r#"
Promise.all(
  Array.from(document.images)
    .filter(img => !img.complete)
    .map(img => new Promise(resolve => { img.onload = img.onerror = resolve; }))
).then(pending => pending.length)
"#;

const OUTER_HTML_JS: &str = "document.documentElement.outerHTML";

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Find a Chromium-family binary on this machine.
pub fn find_chromium() -> Option<PathBuf> {
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

pub struct ChromiumRenderer {
    executable: PathBuf,
    active_sessions: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Use `chrome_path` when given, otherwise look the browser up.
    pub fn new(chrome_path: Option<PathBuf>) -> Result<Self> {
        let executable = match chrome_path {
            Some(path) => path,
            None => find_chromium()
                .context("Chromium not found. Install Chrome or set URL2POST_CHROME_PATH.")?,
        };
        Ok(Self {
            executable,
            active_sessions: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of browser sessions currently open.
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Relaxed)
    }

    async fn launch(&self, options: &RenderOptions) -> Result<Session> {
        let profile_dir = std::env::temp_dir().join(format!(
            "url2post-{}-{}",
            std::process::id(),
            SESSION_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let mut guard = SessionGuard::new(profile_dir, Arc::clone(&self.active_sessions));

        let config = BrowserConfig::builder()
            .new_headless_mode()
            .chrome_executable(&self.executable)
            .user_data_dir(&guard.profile_dir)
            .window_size(options.viewport_width, options.viewport_height)
            .viewport(Viewport {
                width: options.viewport_width,
                height: options.viewport_height,
                ..Default::default()
            })
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        guard.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        }));

        Ok(Session { browser, guard })
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> RenderedPage {
        let start = Instant::now();

        let session = match self.launch(options).await {
            Ok(session) => session,
            Err(e) => {
                return RenderedPage::failed(url, format!("{e:#}"), elapsed_ms(start));
            }
        };
        debug!(url, active = self.active_sessions(), "browser session opened");

        let captured = session.capture(url, options).await;
        session.close().await;

        match captured {
            Ok(html) => RenderedPage::rendered(url, html, elapsed_ms(start)),
            Err(e) => RenderedPage::failed(url, format!("{e:#}"), elapsed_ms(start)),
        }
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

/// One launched browser. [`Session::close`] shuts it down politely; if the
/// render is cancelled instead, dropping the session kills the browser and
/// the guard still cleans up.
struct Session {
    browser: Browser,
    // Declared last: dropped after the browser process is gone.
    guard: SessionGuard,
}

/// Owns the per-session resources that must be released on every exit
/// path: the event-handler task, the profile directory and the slot in the
/// live-session count.
struct SessionGuard {
    profile_dir: PathBuf,
    handler: Option<JoinHandle<()>>,
    active_sessions: Arc<AtomicUsize>,
}

impl SessionGuard {
    fn new(profile_dir: PathBuf, active_sessions: Arc<AtomicUsize>) -> Self {
        active_sessions.fetch_add(1, Ordering::Relaxed);
        SessionGuard {
            profile_dir,
            handler: None,
            active_sessions,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if let Err(e) = std::fs::remove_dir_all(&self.profile_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(dir = %self.profile_dir.display(), "failed to remove profile dir: {e}");
            }
        }
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Session {
    async fn capture(&self, url: &str, options: &RenderOptions) -> Result<String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open tab")?;

        page.execute(SetCacheDisabledParams::new(true))
            .await
            .context("failed to disable cache")?;

        let navigation = tokio::time::timeout(
            Duration::from_millis(options.navigation_timeout_ms),
            page.goto(url),
        )
        .await;
        match navigation {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!(
                "navigation timed out after {}ms",
                options.navigation_timeout_ms
            ),
        }

        let wait_images = EvaluateParams::builder()
            .expression(WAIT_FOR_IMAGES_JS)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build image wait: {e}"))?;
        let waited = tokio::time::timeout(
            Duration::from_millis(options.image_wait_ms),
            page.evaluate_expression(wait_images),
        )
        .await;
        if waited.is_err() {
            debug!(url, wait_ms = options.image_wait_ms, "images still loading, continuing");
        }

        let html: String = page
            .evaluate(OUTER_HTML_JS)
            .await
            .context("failed to read rendered HTML")?
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        let _ = page.close().await;
        Ok(html)
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("browser close failed: {e}");
        }
        let _ = self.browser.wait().await;
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
