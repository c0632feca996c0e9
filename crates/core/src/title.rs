//! Title extraction from generated outline text.
//!
//! Models format outlines inconsistently, so this is a documented
//! best-effort heuristic rather than a parser. Candidates are tried in
//! order of reliability and each must survive validation; when nothing
//! survives, the capitalized topic string is the fallback, so a title
//! is always produced.

use std::sync::LazyLock;

use regex::Regex;

/// Minimum character length for any accepted title candidate.
pub const MIN_TITLE_LEN: usize = 4;

/// Minimum length for a bold span to plausibly be a title rather than
/// an inline emphasis.
pub const MIN_BOLD_TITLE_LEN: usize = 10;

/// Section labels that a bold span must not be (an outline's
/// `**Introduction**` heading is never the article title).
const GENERIC_LABELS: &[&str] = &[
    "introduction",
    "conclusion",
    "outline",
    "summary",
    "overview",
    "title",
    "heading",
    "section",
    "body",
    "faq",
];

/// `Title: "..."` or `Title: ...` on one line.
static INLINE_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)^\s*(?:\*\*)?title(?:\*\*)?[ \t]*[:\-][ \t]*(.+)$"#).expect("valid regex")
});

/// A bare `Title:` label line, title expected on the following line.
static LABEL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)^\s*(?:\*\*)?title(?:\*\*)?\s*[:\-]?\s*$"#).expect("valid regex")
});

/// First `**bold span**`.
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+)\*\*").expect("valid regex"));

/// Top-level markdown heading.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,2}\s+(.+)$").expect("valid regex"));

/// Extract a title from outline text, falling back to the capitalized
/// topic when no candidate validates.
pub fn extract_title(outline: &str, topic: &str) -> String {
    if let Some(caps) = INLINE_TITLE_RE.captures(outline) {
        if let Some(title) = validate(&caps[1], MIN_TITLE_LEN) {
            return title;
        }
    }

    if let Some(m) = LABEL_LINE_RE.find(outline) {
        let rest = &outline[m.end()..];
        if let Some(line) = rest.lines().find(|l| !l.trim().is_empty()) {
            if let Some(title) = validate(line, MIN_TITLE_LEN) {
                return title;
            }
        }
    }

    for caps in BOLD_RE.captures_iter(outline) {
        let span = caps[1].trim();
        if is_generic_label(span) {
            continue;
        }
        if let Some(title) = validate(span, MIN_BOLD_TITLE_LEN) {
            return title;
        }
    }

    if let Some(caps) = HEADING_RE.captures(outline) {
        if let Some(title) = validate(&caps[1], MIN_TITLE_LEN) {
            return title;
        }
    }

    capitalize_words(topic)
}

/// Strip markdown residue and surrounding quotes, then enforce the
/// minimum length and reject bare label words.
fn validate(candidate: &str, min_len: usize) -> Option<String> {
    let cleaned = candidate
        .trim()
        .trim_matches(['"', '\u{201c}', '\u{201d}', '\'', '*', '#'])
        .trim()
        .to_string();

    if cleaned.chars().count() < min_len || is_generic_label(&cleaned) {
        return None;
    }
    Some(cleaned)
}

fn is_generic_label(s: &str) -> bool {
    GENERIC_LABELS.contains(&s.trim().to_lowercase().as_str())
}

/// Capitalize the first letter of every word of the topic string.
pub fn capitalize_words(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Fixture outlines in the shapes models actually emit.

    const LABELED_OUTLINE: &str = "\
Title: \"The Complete Guide to Composting at Home\"

**Introduction**
- Why composting matters
**Section 1: Getting Started**
- Choosing a bin";

    const LABEL_ON_OWN_LINE: &str = "\
Title:
Ten Rainwater Harvesting Mistakes to Avoid

1. Introduction
2. Gutter sizing";

    const BOLD_TITLE_OUTLINE: &str = "\
**Why Urban Beekeeping Is Booming in 2025**

**Introduction**
- hook paragraph
**Conclusion**";

    const HEADING_OUTLINE: &str = "\
# A Beginner's Guide to Sourdough

## Introduction
Starter basics.";

    const UNSTRUCTURED_OUTLINE: &str = "\
- point one
- point two
- point three";

    #[test]
    fn inline_label_with_quotes() {
        assert_eq!(
            extract_title(LABELED_OUTLINE, "composting"),
            "The Complete Guide to Composting at Home"
        );
    }

    #[test]
    fn inline_label_without_quotes() {
        let outline = "Title: Five Ways to Winterize Your Garden\n\n1. Mulching";
        assert_eq!(
            extract_title(outline, "garden"),
            "Five Ways to Winterize Your Garden"
        );
    }

    #[test]
    fn label_on_its_own_line() {
        assert_eq!(
            extract_title(LABEL_ON_OWN_LINE, "rainwater"),
            "Ten Rainwater Harvesting Mistakes to Avoid"
        );
    }

    #[test]
    fn bold_span_skips_generic_labels() {
        assert_eq!(
            extract_title(BOLD_TITLE_OUTLINE, "beekeeping"),
            "Why Urban Beekeeping Is Booming in 2025"
        );
    }

    #[test]
    fn short_bold_span_is_not_a_title() {
        let outline = "**Intro!**\n# The Long-Form Heading Candidate Here";
        assert_eq!(
            extract_title(outline, "x"),
            "The Long-Form Heading Candidate Here"
        );
    }

    #[test]
    fn heading_candidate() {
        assert_eq!(
            extract_title(HEADING_OUTLINE, "sourdough"),
            "A Beginner's Guide to Sourdough"
        );
    }

    #[test]
    fn falls_back_to_capitalized_topic() {
        assert_eq!(
            extract_title(UNSTRUCTURED_OUTLINE, "backyard chicken coops"),
            "Backyard Chicken Coops"
        );
    }

    #[test]
    fn label_word_alone_is_rejected() {
        // `Title: Outline` — the "candidate" is itself a label word.
        let outline = "Title: Outline\n\nbody text";
        assert_eq!(extract_title(outline, "solar panels"), "Solar Panels");
    }

    #[test]
    fn capitalize_words_handles_mixed_case() {
        assert_eq!(capitalize_words("best DIY ideas"), "Best DIY Ideas");
    }
}
