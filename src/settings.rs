use std::path::PathBuf;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::acquisition::pruning::PruneConfig;
use crate::acquisition::render::RenderOptions;
use crate::generation::client::CompletionOptions;

const CONFIG_FILE: &str = "url2post";
const ENV_PREFIX: &str = "URL2POST";
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Chromium,
    Spider,
}

/// Resolved process configuration. Built once at startup and handed to the
/// components that need it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,

    pub renderer: RendererKind,
    pub chrome_path: Option<PathBuf>,
    pub spider_api_key: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub navigation_timeout_ms: u64,
    pub image_wait_ms: u64,

    pub prune_threshold: f64,
    pub min_word_threshold: usize,

    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: None,
            api_key: None,
            model: "xiaomi/mimo-v2-flash:free".to_string(),
            temperature: 0.2,
            max_tokens: 1000,
            request_timeout_secs: 120,
            renderer: RendererKind::Chromium,
            chrome_path: None,
            spider_api_key: None,
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout_ms: 30_000,
            image_wait_ms: 10_000,
            prune_threshold: 0.4,
            min_word_threshold: 10,
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `url2post.toml` if present, then `URL2POST_*` env vars.
    pub fn load() -> Result<Self> {
        let raw = Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?;
        let mut settings: Settings = raw
            .try_deserialize()
            .context("Invalid configuration")?;

        // Credentials commonly live under the provider's own variable names.
        if settings.api_key.is_none() {
            settings.api_key = env_non_empty("OPENROUTER_API_KEY")
                .or_else(|| env_non_empty("OPENAI_API_KEY"));
        }
        if settings.base_url.is_none() {
            settings.base_url = env_non_empty("OPENAI_BASE_URL");
        }
        if settings.spider_api_key.is_none() {
            settings.spider_api_key = env_non_empty("SPIDER_API_KEY");
        }
        Ok(settings)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// The model credential, required by every command that generates.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("Missing API key: set URL2POST_API_KEY or OPENROUTER_API_KEY")
        })
    }

    pub fn prune_config(&self) -> PruneConfig {
        PruneConfig {
            threshold: self.prune_threshold,
            min_words: self.min_word_threshold,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            navigation_timeout_ms: self.navigation_timeout_ms,
            image_wait_ms: self.image_wait_ms,
        }
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            tools_disabled: true,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
