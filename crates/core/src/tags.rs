//! Tag derivation for created content.
//!
//! Tags are the union of caller-supplied keywords, significant words
//! from the topic string, and emphasized phrases lifted from the
//! rendered markup. Best-effort by design: the goal is a plausible tag
//! set, not linguistic precision.

use std::sync::LazyLock;

use regex::Regex;

/// Hard cap on the number of tags attached to one piece of content.
pub const MAX_TAGS: usize = 10;

/// Topic words at or below this length are noise.
pub const MIN_TOPIC_WORD_LEN: usize = 4;

/// Length bounds for any accepted tag.
pub const MIN_TAG_LEN: usize = 3;
pub const MAX_TAG_LEN: usize = 49;

/// How many emphasized phrases to harvest from the markup.
const MAX_EMPHASIS_TAGS: usize = 5;

/// Emphasized-phrase length bounds (tighter than the global tag bounds).
const MIN_EMPHASIS_LEN: usize = 3;
const MAX_EMPHASIS_LEN: usize = 29;

/// Closed stop-word set for topic tokenization.
const STOP_WORDS: &[&str] = &[
    "about", "after", "against", "among", "because", "been", "before", "being", "best",
    "between", "both", "could", "does", "doing", "down", "during", "each", "every", "from",
    "guide", "have", "having", "here", "how", "into", "just", "like", "make", "more", "most",
    "much", "must", "only", "other", "over", "same", "should", "some", "such", "than", "that",
    "their", "them", "then", "there", "these", "they", "this", "tips", "under", "until",
    "very", "ways", "were", "what", "when", "where", "which", "while", "will", "with",
    "would", "your",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9'-]*").expect("valid regex"));

static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:strong|em)>([^<]+)</(?:strong|em)>").expect("valid regex")
});

/// Derive the tag list for a piece of content.
///
/// Sources, in order: the caller's keywords, stop-word-filtered topic
/// words, then up to [`MAX_EMPHASIS_TAGS`] emphasized phrases from the
/// markup. Deduplicated case-insensitively, bounded to
/// [`MIN_TAG_LEN`]..=[`MAX_TAG_LEN`] characters, capped at [`MAX_TAGS`].
pub fn derive_tags(keywords: &[String], topic: &str, markup: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    let mut push = |candidate: &str, tags: &mut Vec<String>, seen: &mut Vec<String>| {
        let cleaned = candidate.trim();
        let len = cleaned.chars().count();
        if len < MIN_TAG_LEN || len > MAX_TAG_LEN {
            return;
        }
        let folded = cleaned.to_lowercase();
        if seen.contains(&folded) {
            return;
        }
        seen.push(folded);
        tags.push(cleaned.to_string());
    };

    for keyword in keywords {
        push(keyword, &mut tags, &mut seen);
    }

    for word in WORD_RE.find_iter(topic) {
        let word = word.as_str();
        if word.chars().count() <= MIN_TOPIC_WORD_LEN - 1 {
            continue;
        }
        if STOP_WORDS.contains(&word.to_lowercase().as_str()) {
            continue;
        }
        push(word, &mut tags, &mut seen);
    }

    let mut emphasized = 0;
    for caps in EMPHASIS_RE.captures_iter(markup) {
        if emphasized >= MAX_EMPHASIS_TAGS {
            break;
        }
        emphasized += 1;
        let phrase = caps[1].trim();
        let len = phrase.chars().count();
        if (MIN_EMPHASIS_LEN..=MAX_EMPHASIS_LEN).contains(&len) {
            push(phrase, &mut tags, &mut seen);
        }
    }

    tags.truncate(MAX_TAGS);
    tags
}
