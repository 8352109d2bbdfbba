pub mod client;
pub mod extract;
pub mod post;
pub mod prompt;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use client::{CompletionOptions, CompletionProvider, ProviderError};
use post::StructuredPost;

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("document text is empty")]
    EmptyInput,

    #[error("model call failed: {0}")]
    Transport(#[from] ProviderError),

    #[error("model returned an empty reply")]
    EmptyReply,

    #[error("no parseable JSON in reply ({reason}); reply began: {excerpt:?}")]
    Unparsable { reason: String, excerpt: String },

    #[error("reply does not match the post schema ({reason}); reply began: {excerpt:?}")]
    SchemaInvalid { reason: String, excerpt: String },
}

impl GenerationError {
    /// Leading characters of the model reply, when one was received.
    pub fn raw_reply_excerpt(&self) -> Option<&str> {
        match self {
            GenerationError::Unparsable { excerpt, .. }
            | GenerationError::SchemaInvalid { excerpt, .. } => Some(excerpt),
            _ => None,
        }
    }
}

fn excerpt(reply: &str) -> String {
    reply.chars().take(EXCERPT_CHARS).collect()
}

/// Turns document text into a validated [`StructuredPost`] with one model
/// call. Shared freely across concurrent requests.
pub struct Generator {
    provider: Arc<dyn CompletionProvider>,
    options: CompletionOptions,
}

impl Generator {
    pub fn new(provider: Arc<dyn CompletionProvider>, options: CompletionOptions) -> Self {
        Generator { provider, options }
    }

    pub async fn generate(&self, document_text: &str) -> Result<StructuredPost, GenerationError> {
        if document_text.trim().is_empty() {
            return Err(GenerationError::EmptyInput);
        }

        let reply = self
            .provider
            .complete(prompt::SYSTEM_PROMPT, document_text, &self.options)
            .await
            .inspect_err(|e| warn!(model = self.provider.model(), "Generation call failed: {}", e))?;
        debug!(chars = reply.len(), "Raw output: {}", excerpt(&reply));

        let post = parse_reply(&reply)?;
        info!(
            model = self.provider.model(),
            title = %post.title,
            tags = post.tags.len(),
            "Generated post"
        );
        Ok(post)
    }
}

/// Reply text → validated post, without any model call.
pub fn parse_reply(reply: &str) -> Result<StructuredPost, GenerationError> {
    if reply.trim().is_empty() {
        return Err(GenerationError::EmptyReply);
    }

    let (strategy, value) =
        extract::extract_json(reply).map_err(|reason| GenerationError::Unparsable {
            reason,
            excerpt: excerpt(reply),
        })?;
    debug!(strategy = strategy.name(), "Extracted JSON candidate");

    let schema_error = |reason: String| GenerationError::SchemaInvalid {
        reason,
        excerpt: excerpt(reply),
    };
    let post: StructuredPost =
        serde_json::from_value(value).map_err(|e| schema_error(e.to_string()))?;
    post.validate().map_err(schema_error)?;
    Ok(post)
}
