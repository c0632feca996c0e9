//! Per-step prompt construction and SEO-response parsing.
//!
//! Prompts are deliberately plain: the interesting behavior (model
//! shaping, retries) lives in the client, and tests pin the pieces the
//! engine depends on — the word-count target, keyword weaving, and the
//! fenced-JSON tolerance of the SEO parser.

use draftpress_core::step::GenerationStep;

use crate::job::{GenerationJob, SeoFields};

/// System prompt shared by every text step.
pub const SYSTEM_PROMPT: &str =
    "You are a professional long-form content writer. Follow the instructions exactly \
     and return only the requested text with no preamble.";

/// How much of the article the SEO prompt gets to look at.
const SEO_EXCERPT_CHARS: usize = 1_500;

/// Build the prompt for a text step. Callers guarantee prerequisites
/// exist; a missing one is a programming error surfaced by the engine
/// before this point.
pub fn step_prompt(job: &GenerationJob, step: GenerationStep) -> String {
    match step {
        GenerationStep::Outline => outline_prompt(job),
        GenerationStep::Content => content_prompt(job),
        GenerationStep::Humanize => humanize_prompt(job),
        GenerationStep::Seo => seo_prompt(job),
        // Non-text steps never reach prompt construction.
        GenerationStep::Finalize | GenerationStep::Image | GenerationStep::Complete => {
            String::new()
        }
    }
}

fn keyword_clause(keywords: &[String]) -> String {
    if keywords.is_empty() {
        String::new()
    } else {
        format!(
            " Naturally incorporate these keywords: {}.",
            keywords.join(", ")
        )
    }
}

fn outline_prompt(job: &GenerationJob) -> String {
    format!(
        "Create a detailed blog post outline for the topic \"{topic}\". \
         Start with a line 'Title: \"...\"' proposing the post title, then list \
         the sections with 2-4 bullet points each.{keywords}",
        topic = job.topic,
        keywords = keyword_clause(&job.options.keywords),
    )
}

fn content_prompt(job: &GenerationJob) -> String {
    let outline = job.step_output(GenerationStep::Outline).unwrap_or_default();
    format!(
        "Write a complete blog post of roughly {words} words in markdown, \
         following this outline exactly:\n\n{outline}\n\n\
         Use ## headings for sections. Do not repeat the title.{keywords}",
        words = job.options.word_count,
        keywords = keyword_clause(&job.options.keywords),
    )
}

fn humanize_prompt(job: &GenerationJob) -> String {
    let content = job.step_output(GenerationStep::Content).unwrap_or_default();
    format!(
        "Rewrite the following article so it reads naturally and conversationally, \
         at intensity {intensity} on a 0-10 scale (higher = more casual). Keep the \
         markdown structure, headings, and factual content intact:\n\n{content}",
        intensity = job.options.humanize_intensity,
    )
}

fn seo_prompt(job: &GenerationJob) -> String {
    let content = job.publishable_text().unwrap_or_default();
    let excerpt: String = content.chars().take(SEO_EXCERPT_CHARS).collect();
    format!(
        "Based on this article about \"{topic}\", return a JSON object with exactly \
         these keys: \"seo_title\" (under 60 chars), \"meta_description\" (under 155 \
         chars), \"focus_keyword\" (2-4 words). Return only the JSON.\n\n{excerpt}",
        topic = job.topic,
    )
}

/// Parse the SEO step's output, tolerating fenced code blocks and
/// leading prose around the JSON object.
pub fn parse_seo_response(raw: &str) -> Option<SeoFields> {
    let trimmed = strip_fences(raw);
    // Models sometimes prefix "Here is the JSON:" — cut to the braces.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}
