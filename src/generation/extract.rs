//! Locating the JSON object in an untrusted model reply.
//!
//! Strategies are tried in a fixed order. Each one either proposes a
//! candidate slice or declines; the first candidate that parses as JSON wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// First `{` through last `}`.
    BraceSpan,
    /// Whole reply with a leading ```` ```json ```` / ```` ``` ```` fence and a
    /// trailing ```` ``` ```` fence removed.
    Fenced,
}

pub const STRATEGIES: &[Strategy] = &[Strategy::BraceSpan, Strategy::Fenced];

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::BraceSpan => "brace_span",
            Strategy::Fenced => "fenced",
        }
    }

    pub fn candidate(self, reply: &str) -> Option<&str> {
        match self {
            Strategy::BraceSpan => brace_span(reply),
            Strategy::Fenced => fenced(reply),
        }
    }
}

fn brace_span(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn fenced(reply: &str) -> Option<&str> {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

/// Drop complete `<think>...</think>` sections emitted by reasoning models.
pub fn strip_reasoning(reply: &str) -> std::borrow::Cow<'_, str> {
    THINK_RE.replace_all(reply, "")
}

/// Run the strategy chain. On failure the error describes why the last
/// candidate did not parse, or that no strategy proposed one.
pub fn extract_json(reply: &str) -> Result<(Strategy, Value), String> {
    let cleaned = strip_reasoning(reply);
    let mut last_error = None;

    for &strategy in STRATEGIES {
        let Some(candidate) = strategy.candidate(&cleaned) else {
            continue;
        };
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return Ok((strategy, value)),
            Err(e) => last_error = Some(format!("{}: {}", strategy.name(), e)),
        }
    }

    Err(last_error.unwrap_or_else(|| "no JSON candidate in reply".to_string()))
}
