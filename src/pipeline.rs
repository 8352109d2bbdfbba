use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::acquisition::chromium::ChromiumRenderer;
use crate::acquisition::render::PageRenderer;
use crate::acquisition::spider::SpiderRenderer;
use crate::acquisition::{Crawler, ExtractedContent, FetchError};
use crate::settings::{RendererKind, Settings};
use crate::generation::client::OpenAiClient;
use crate::generation::post::StructuredPost;
use crate::generation::{GenerationError, Generator};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Crawler and generator, built once and shared by every request.
pub struct Pipeline {
    crawler: Crawler,
    generator: Generator,
}

impl Pipeline {
    pub fn new(crawler: Crawler, generator: Generator) -> Self {
        Pipeline { crawler, generator }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let generator = build_generator(settings)?;
        Ok(Pipeline::new(build_crawler(settings)?, generator))
    }

    /// Fetch then generate. Generation only starts once the page produced
    /// non-empty text.
    pub async fn convert(&self, url: &str) -> Result<StructuredPost, PipelineError> {
        let content = self.crawler.fetch(url).await?;
        let text = document_text(&content, url)?;
        Ok(self.generator.generate(text).await?)
    }
}

fn document_text<'a>(content: &'a ExtractedContent, url: &str) -> Result<&'a str, FetchError> {
    content.document_text().ok_or_else(|| FetchError::NoContent {
        url: url.to_string(),
    })
}

pub fn build_crawler(settings: &Settings) -> Result<Crawler> {
    let renderer: Arc<dyn PageRenderer> = match settings.renderer {
        RendererKind::Chromium => Arc::new(ChromiumRenderer::new(settings.chrome_path.clone())?),
        RendererKind::Spider => Arc::new(SpiderRenderer::new(settings.spider_api_key.clone())?),
    };
    Ok(Crawler::new(
        renderer,
        settings.render_options(),
        settings.prune_config(),
    ))
}

pub fn build_generator(settings: &Settings) -> Result<Generator> {
    let client = OpenAiClient::new(
        settings.base_url(),
        settings.require_api_key()?,
        &settings.model,
        Duration::from_secs(settings.request_timeout_secs),
    )
    .context("Failed to build model client")?;
    Ok(Generator::new(Arc::new(client), settings.completion_options()))
}
