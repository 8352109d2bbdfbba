use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(nav|navbar|menu|footer|sidebar|ad|ads|advert\w*|banner|comments?|share|sharing|social|promo\w*|related|breadcrumbs?)\b",
    )
    .unwrap()
});
/// Overlays and sign-up widgets, rejected like page chrome.
static OVERLAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(cookies?|consent|gdpr|newsletter|subscribe|popup|modal)\b").unwrap()
});
static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(article|content|post|entry|main|body|story|text)\b").unwrap()
});

/// Subtrees that never carry readable content.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "canvas", "iframe", "head", "form",
    "button", "select", "input", "textarea",
];

/// Page chrome. Kept in the raw text, never in the fit text.
const CHROME: &[&str] = &["nav", "footer", "header", "aside"];

/// Document roots. Their classes describe the whole page (`has-sidebar`,
/// `modal-open`), not a region of it.
const ROOTS: &[&str] = &["html", "body"];

const INLINE: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "font",
    "i", "img", "ins", "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strong",
    "sub", "sup", "time", "u", "var", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Code,
    Quote,
    Cell,
    /// Loose text sitting directly inside a container element.
    Inline,
}

/// Where a block sits on the page, judged from its own and its ancestors'
/// tags and class/id attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Chrome,
    Negative,
    Neutral,
    Positive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub tag: String,
    /// Plain text, whitespace collapsed.
    pub text: String,
    /// Inline markdown (links, emphasis, code) without the block prefix.
    pub markdown: String,
    /// Characters of `text` that sit inside links.
    pub link_chars: usize,
    /// Length of the block's source HTML.
    pub markup_chars: usize,
    pub region: Region,
}

impl Block {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn text_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Partition a rendered document into content blocks, in document order.
pub fn extract_blocks(html: &str) -> Vec<Block> {
    let doc = Html::parse_document(html);
    let mut blocks = Vec::new();
    walk_container(doc.root_element(), Region::Neutral, &mut blocks);
    blocks
}

fn walk_container(el: ElementRef<'_>, inherited: Region, out: &mut Vec<Block>) {
    let region = region_for(el, inherited);
    let mut run = Inline::default();

    for child in el.children() {
        match child.value() {
            Node::Text(t) => run.push_text(t, false),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_el.value().name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                if INLINE.contains(&name) {
                    run.push_element(child_el, false);
                    run.markup_chars += child_el.html().chars().count();
                } else if let Some(kind) = leaf_kind(name) {
                    flush_run(&mut run, el, region, out);
                    if let Some(block) = leaf_block(child_el, kind, region) {
                        out.push(block);
                    }
                } else {
                    flush_run(&mut run, el, region, out);
                    walk_container(child_el, region, out);
                }
            }
            _ => {}
        }
    }

    flush_run(&mut run, el, region, out);
}

fn flush_run(run: &mut Inline, parent: ElementRef<'_>, region: Region, out: &mut Vec<Block>) {
    let taken = std::mem::take(run);
    let text = squash(&taken.text);
    if text.is_empty() {
        return;
    }
    out.push(Block {
        kind: BlockKind::Inline,
        tag: parent.value().name().to_string(),
        markdown: squash(&taken.markdown),
        link_chars: taken.link_chars,
        markup_chars: taken.markup_chars.max(text.chars().count()),
        text,
        region,
    });
}

fn leaf_kind(name: &str) -> Option<BlockKind> {
    let kind = match name {
        "p" | "figcaption" | "caption" | "dt" | "dd" => BlockKind::Paragraph,
        "li" => BlockKind::ListItem,
        "pre" => BlockKind::Code,
        "blockquote" => BlockKind::Quote,
        "td" | "th" => BlockKind::Cell,
        _ => {
            let level = name.strip_prefix('h')?.parse::<u8>().ok()?;
            if !(1..=6).contains(&level) {
                return None;
            }
            BlockKind::Heading(level)
        }
    };
    Some(kind)
}

fn leaf_block(el: ElementRef<'_>, kind: BlockKind, inherited: Region) -> Option<Block> {
    let region = region_for(el, inherited);
    let markup_chars = el.html().chars().count();

    if kind == BlockKind::Code {
        let code: String = el.text().collect();
        let code = code.trim_matches('\n').to_string();
        if code.trim().is_empty() {
            return None;
        }
        return Some(Block {
            kind,
            tag: el.value().name().to_string(),
            text: squash(&code),
            markdown: code,
            link_chars: 0,
            markup_chars,
            region,
        });
    }

    let mut inline = Inline::default();
    inline.push_children(el, false);
    let text = squash(&inline.text);
    if text.is_empty() {
        return None;
    }
    Some(Block {
        kind,
        tag: el.value().name().to_string(),
        text,
        markdown: squash(&inline.markdown),
        link_chars: inline.link_chars,
        markup_chars,
        region,
    })
}

fn region_for(el: ElementRef<'_>, inherited: Region) -> Region {
    if inherited == Region::Chrome {
        return Region::Chrome;
    }
    let name = el.value().name();
    if CHROME.contains(&name) {
        return Region::Chrome;
    }
    let role = el.value().attr("role").unwrap_or("");
    if role == "navigation" || role == "contentinfo" || role == "banner" {
        return Region::Chrome;
    }
    if ROOTS.contains(&name) {
        return inherited;
    }
    if name == "article" || name == "main" || role == "main" {
        return Region::Positive;
    }

    let class = el.value().attr("class").unwrap_or("");
    let id = el.value().id().unwrap_or("");
    if OVERLAY_RE.is_match(class) || OVERLAY_RE.is_match(id) {
        return Region::Chrome;
    }
    if NEGATIVE_RE.is_match(class) || NEGATIVE_RE.is_match(id) {
        return Region::Negative;
    }
    // A content container lifts a negative wrapper.
    if POSITIVE_RE.is_match(class) || POSITIVE_RE.is_match(id) {
        return Region::Positive;
    }
    inherited
}

/// Accumulates the inline content of one block.
#[derive(Default)]
struct Inline {
    text: String,
    markdown: String,
    link_chars: usize,
    markup_chars: usize,
}

impl Inline {
    fn push_text(&mut self, t: &str, in_link: bool) {
        self.text.push_str(t);
        self.markdown.push_str(t);
        self.markup_chars += t.chars().count();
        if in_link {
            self.link_chars += squash(t).chars().count();
        }
    }

    fn push_children(&mut self, el: ElementRef<'_>, in_link: bool) {
        for child in el.children() {
            match child.value() {
                Node::Text(t) => self.push_text(t, in_link),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.push_element(child_el, in_link);
                    }
                }
                _ => {}
            }
        }
    }

    fn push_element(&mut self, el: ElementRef<'_>, in_link: bool) {
        let name = el.value().name();
        if SKIPPED.contains(&name) || name == "img" {
            return;
        }
        if name == "br" {
            self.text.push(' ');
            self.markdown.push(' ');
            return;
        }

        let mut inner = Inline::default();
        inner.push_children(el, in_link || name == "a");
        let nested_block = !INLINE.contains(&name);
        if nested_block {
            self.text.push(' ');
        }
        self.text.push_str(&inner.text);
        if nested_block {
            self.text.push(' ');
        }
        self.link_chars += inner.link_chars;

        let md = match name {
            "a" => match el.value().attr("href").map(str::trim) {
                Some(href) if !href.is_empty() && !href.starts_with("javascript:") => {
                    wrap(&inner.markdown, "[", &format!("]({href})"))
                }
                _ => inner.markdown,
            },
            "strong" | "b" => wrap(&inner.markdown, "**", "**"),
            "em" | "i" => wrap(&inner.markdown, "*", "*"),
            "code" | "kbd" | "samp" => wrap(&inner.markdown, "`", "`"),
            _ if INLINE.contains(&name) => inner.markdown,
            // Block elements nested inside a leaf (e.g. a list inside <li>).
            _ => format!(" {} ", inner.markdown),
        };
        self.markdown.push_str(&md);
    }
}

/// Surround the trimmed `inner` with markers, keeping outer whitespace.
fn wrap(inner: &str, open: &str, close: &str) -> String {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return inner.to_string();
    }
    let lead = if inner.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if inner.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{lead}{open}{}{close}{trail}", squash(trimmed))
}

fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(html: &str) -> Block {
        let blocks = extract_blocks(html);
        assert_eq!(blocks.len(), 1, "expected one block, got: {:?}", blocks);
        blocks.into_iter().next().unwrap()
    }

    #[test]
    fn paragraph() {
        let b = only("<html><body><p>Hello   <b>bold</b> world</p></body></html>");
        assert_eq!(b.kind, BlockKind::Paragraph);
        assert_eq!(b.text, "Hello bold world");
        assert_eq!(b.markdown, "Hello **bold** world");
        assert_eq!(b.link_chars, 0);
        assert_eq!(b.region, Region::Neutral);
    }

    #[test]
    fn heading_level() {
        let b = only("<h3>Section title</h3>");
        assert_eq!(b.kind, BlockKind::Heading(3));
        assert_eq!(b.text, "Section title");
    }

    #[test]
    fn link_chars_counted() {
        let b = only(r#"<p>See <a href="https://example.com/x">the docs</a> now</p>"#);
        assert_eq!(b.link_chars, "the docs".len());
        assert_eq!(b.markdown, "See [the docs](https://example.com/x) now");
    }

    #[test]
    fn images_and_scripts_dropped() {
        let blocks = extract_blocks(
            r#"<body><script>var x = 1;</script><p>Text <img src="a.png" alt="pic"> here</p><style>p{}</style></body>"#,
        );
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Text here");
        assert!(!blocks[0].markdown.contains("a.png"));
    }

    #[test]
    fn pre_keeps_whitespace() {
        let b = only("<pre>fn main() {\n    run();\n}</pre>");
        assert_eq!(b.kind, BlockKind::Code);
        assert_eq!(b.markdown, "fn main() {\n    run();\n}");
    }

    #[test]
    fn loose_container_text_becomes_inline_block() {
        let blocks = extract_blocks("<div>Loose <em>text</em><p>Para</p>tail</div>");
        let kinds: Vec<_> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Inline, BlockKind::Paragraph, BlockKind::Inline]
        );
        assert_eq!(blocks[0].markdown, "Loose *text*");
        assert_eq!(blocks[0].tag, "div");
        assert_eq!(blocks[2].text, "tail");
    }

    #[test]
    fn chrome_region_is_sticky() {
        let blocks = extract_blocks(
            r#"<nav><div class="article"><p>Home and other links</p></div></nav><main><p>Body</p></main>"#,
        );
        assert_eq!(blocks[0].region, Region::Chrome);
        assert_eq!(blocks[1].region, Region::Positive);
    }

    #[test]
    fn class_hints() {
        let blocks = extract_blocks(
            r#"<div class="sidebar-widget"><p>Popular</p></div><div id="post-body"><p>Story</p></div><div class="shadow"><p>Plain</p></div><div class="cookie-banner"><p>We use cookies</p></div>"#,
        );
        assert_eq!(blocks[0].region, Region::Negative);
        assert_eq!(blocks[1].region, Region::Positive);
        assert_eq!(blocks[2].region, Region::Neutral);
        assert_eq!(blocks[3].region, Region::Chrome);
    }

    #[test]
    fn body_classes_do_not_mark_the_page() {
        let blocks = extract_blocks(
            r#"<html class="no-js"><body class="single-post has-sidebar modal-open"><div class="wrap"><p>Loose paragraph</p></div><article><p>Body</p></article></body></html>"#,
        );
        assert_eq!(blocks[0].region, Region::Neutral);
        assert_eq!(blocks[1].region, Region::Positive);
    }

    #[test]
    fn content_container_lifts_negative_wrapper() {
        let blocks = extract_blocks(
            r#"<div class="layout-with-sidebar"><aside>Links</aside><div class="entry-content"><p>Story</p></div><article><p>More</p></article></div>"#,
        );
        let regions: Vec<_> = blocks.iter().map(|b| (b.text.as_str(), b.region)).collect();
        assert_eq!(
            regions,
            vec![
                ("Links", Region::Chrome),
                ("Story", Region::Positive),
                ("More", Region::Positive),
            ]
        );
    }

    #[test]
    fn markup_measured_in_chars() {
        let b = only("<p>潮汐发电试点项目顺利度过了第一个冬天</p>");
        assert_eq!(b.markup_chars, b.text_chars() + "<p></p>".len());
    }

    #[test]
    fn empty_document() {
        assert!(extract_blocks("").is_empty());
        assert!(extract_blocks("<html><body>   </body></html>").is_empty());
    }

    #[test]
    fn article_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/article.html").unwrap();
        let blocks = extract_blocks(&html);
        assert!(blocks.iter().any(|b| matches!(b.kind, BlockKind::Heading(1))));
        assert!(blocks.iter().any(|b| b.region == Region::Chrome));
        assert!(blocks.iter().any(|b| b.region == Region::Positive));
        assert!(blocks.iter().all(|b| !b.text.contains("trackPageView")));
    }
}
