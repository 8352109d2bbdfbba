use std::sync::LazyLock;

use regex::Regex;

use super::blocks::{Block, BlockKind};

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Render blocks as markdown, one paragraph per block.
pub fn render(blocks: &[Block]) -> String {
    let body = blocks
        .iter()
        .map(render_block)
        .filter(|md| !md.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    normalize(&body)
}

fn render_block(block: &Block) -> String {
    let md = block.markdown.as_str();
    match block.kind {
        BlockKind::Heading(level) => format!("{} {}", "#".repeat(level as usize), md),
        BlockKind::ListItem => format!("- {}", md),
        BlockKind::Quote => format!("> {}", md),
        BlockKind::Code => format!("```\n{}\n```", md),
        BlockKind::Paragraph | BlockKind::Cell | BlockKind::Inline => md.to_string(),
    }
}

/// Remove markdown image syntax, collapse blank-line runs and trim.
pub fn normalize(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").trim().to_string()
}
