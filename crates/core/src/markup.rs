//! Markdown to block-structured markup.
//!
//! The content store ingests block-delimited HTML: each top-level
//! element wrapped in `<!-- block:<kind> -->` / `<!-- /block:<kind> -->`
//! comments. Generated text arrives as loose markdown, so chunks are
//! split on blank lines, classified, and rendered individually with
//! pulldown-cmark (which also handles inline emphasis and links).

use pulldown_cmark::{html, Options, Parser};

/// Kind of a top-level content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading,
    List,
    Quote,
    Paragraph,
}

impl BlockKind {
    fn name(self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::List => "list",
            Self::Quote => "quote",
            Self::Paragraph => "paragraph",
        }
    }
}

/// Classify a markdown chunk by its first line.
fn classify(chunk: &str) -> BlockKind {
    let first = chunk.lines().next().unwrap_or("").trim_start();
    if first.starts_with('#') {
        BlockKind::Heading
    } else if first.starts_with("- ")
        || first.starts_with("* ")
        || first
            .split_once('.')
            .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    {
        BlockKind::List
    } else if first.starts_with('>') {
        BlockKind::Quote
    } else {
        BlockKind::Paragraph
    }
}

/// Render one markdown chunk to HTML.
fn render_chunk(chunk: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(chunk, Options::empty()));
    out.trim_end().to_string()
}

/// Convert generated markdown into block-structured markup.
///
/// Consecutive non-blank lines form one block. Blocks that render to
/// nothing (stray horizontal rules, empty chunks) are dropped.
pub fn render_blocks(markdown: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();

    for chunk in markdown.split("\n\n") {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let kind = classify(chunk);
        let body = render_chunk(chunk);
        if body.is_empty() {
            continue;
        }
        blocks.push(format!(
            "<!-- block:{name} -->\n{body}\n<!-- /block:{name} -->",
            name = kind.name(),
        ));
    }

    blocks.join("\n\n")
}
