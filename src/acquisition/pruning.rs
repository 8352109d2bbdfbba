//! Density-pruning filter.
//!
//! Each block gets a score in `[0, 1]` computed only from its own content:
//!
//! ```text
//! 0.4 * text density        (text chars / markup chars, both counted in chars)
//! 0.2 * (1 - link density)  (link chars / text chars)
//! 0.2 * tag weight
//! 0.1 * region hint         (positive 1.0, neutral 0.5, negative 0.0)
//! 0.1 * length factor       (ln(1 + words) / ln(201), capped at 1)
//! - 0.1 when the block sits in a negative class/id region
//! ```
//!
//! Blocks in page chrome (`nav`, `footer`, `header`, `aside`, cookie and
//! sign-up overlays) are always rejected. Because no score depends on the other blocks of the page, the
//! partition is deterministic and pruning an already pruned list is a no-op.

use super::blocks::{Block, Region};

const W_TEXT_DENSITY: f64 = 0.4;
const W_LINK_DENSITY: f64 = 0.2;
const W_TAG: f64 = 0.2;
const W_REGION: f64 = 0.1;
const W_LENGTH: f64 = 0.1;
const NEGATIVE_PENALTY: f64 = 0.1;
const LONG_BLOCK_WORDS: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneConfig {
    /// Minimum score a block needs to be kept.
    pub threshold: f64,
    /// Blocks with fewer words are dropped regardless of score.
    pub min_words: usize,
}

impl Default for PruneConfig {
    fn default() -> Self {
        PruneConfig {
            threshold: 0.4,
            min_words: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    TooShort,
    LowDensity,
    Chrome,
}

#[derive(Debug, Clone, Copy)]
pub struct PruningFilter {
    config: PruneConfig,
}

impl PruningFilter {
    pub fn new(config: PruneConfig) -> Self {
        PruningFilter { config }
    }

    pub fn judge(&self, block: &Block) -> Verdict {
        if block.region == Region::Chrome {
            return Verdict::Chrome;
        }
        if block.word_count() < self.config.min_words {
            return Verdict::TooShort;
        }
        if score(block) < self.config.threshold {
            return Verdict::LowDensity;
        }
        Verdict::Keep
    }

    /// Keep the blocks that pass, preserving document order.
    pub fn prune(&self, blocks: &[Block]) -> Vec<Block> {
        blocks
            .iter()
            .filter(|b| self.judge(b) == Verdict::Keep)
            .cloned()
            .collect()
    }
}

pub fn score(block: &Block) -> f64 {
    let text_chars = block.text_chars();
    if text_chars == 0 {
        return 0.0;
    }

    let text_density = (text_chars as f64 / block.markup_chars.max(1) as f64).min(1.0);
    let link_density = (block.link_chars as f64 / text_chars as f64).min(1.0);
    let region = match block.region {
        Region::Positive => 1.0,
        Region::Neutral => 0.5,
        Region::Negative | Region::Chrome => 0.0,
    };
    let length = ((1.0 + block.word_count() as f64).ln() / (1.0 + LONG_BLOCK_WORDS).ln()).min(1.0);

    let mut total = W_TEXT_DENSITY * text_density
        + W_LINK_DENSITY * (1.0 - link_density)
        + W_TAG * tag_weight(&block.tag)
        + W_REGION * region
        + W_LENGTH * length;
    if block.region == Region::Negative {
        total -= NEGATIVE_PENALTY;
    }
    total.clamp(0.0, 1.0)
}

fn tag_weight(tag: &str) -> f64 {
    match tag {
        "p" | "article" | "main" | "h1" | "h2" | "h3" => 1.0,
        "blockquote" | "pre" => 0.9,
        "section" | "h4" | "h5" | "h6" => 0.8,
        "div" | "li" | "dd" | "dt" | "body" => 0.5,
        "td" | "th" | "figcaption" | "caption" => 0.4,
        "span" => 0.3,
        _ => 0.4,
    }
}
