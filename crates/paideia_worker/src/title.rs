//! Quiz title derivation: one single-shot model attempt, then a deterministic
//! fallback built from the opening words of the source material.

use paideia_reasoning::{ChatBackend, ChatClient, RetryPolicy};
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)--\s*Page\s*\d+\s*--").unwrap());
static LEADING_JUNK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^a-zA-Z0-9_]+").unwrap());

const TITLE_DIRECTIONS: &str = "You are an expert quiz title generator. Your sole \
purpose is to generate a short, relevant quiz title based on provided text and \
return ONLY the title.";

/// Lead-ins that make poor titles when a document starts with them.
const POOR_STARTS: &[&str] = &[
    "this document",
    "this paper",
    "the following text",
    "abstract",
    "introduction",
];

const TITLE_PREFIXES: &[&str] = &[
    "title:",
    "quiz title:",
    "here's a title:",
    "here is a title:",
    "the title is:",
    "generated title:",
];

/// Ask the model for a 1-5 word title. `None` on transport failure or an
/// answer that cleans down to nothing; the caller falls back deterministically.
pub async fn generate_title(
    backend: Arc<dyn ChatBackend>,
    model: &str,
    retry: RetryPolicy,
    source_material: &str,
) -> Option<String> {
    let snippet: String = source_material
        .chars()
        .take(2000)
        .collect::<String>()
        .replace('\n', " ");

    let prompt = format!(
        "Analyze the following text snippet.\n\
         Your ONLY task is to generate a concise, engaging, and relevant title for a quiz based on this text.\n\
         The title MUST be between 1 and 5 words long.\n\
         Your response MUST contain ONLY the generated title and NOTHING ELSE.\n\
         Do NOT include any introductory phrases such as \"Here is a title:\", \"The title is:\", \"Title:\", or similar.\n\
         Do NOT include quotation marks (single or double) around the title in your response.\n\n\
         Text snippet:\n```\n{}\n```\n\n\
         Respond with ONLY the title.",
        snippet.trim()
    );

    let mut chat = ChatClient::new(backend, model, TITLE_DIRECTIONS, retry);
    match chat.send(&prompt).await {
        Ok(reply) => clean_title(&reply),
        Err(e) => {
            tracing::warn!("title generation failed: {e:#}");
            None
        }
    }
}

/// Strip boilerplate prefixes and surrounding quotes from a model-proposed
/// title. `None` if nothing usable remains.
fn clean_title(raw: &str) -> Option<String> {
    let mut title = raw.trim().to_string();
    for prefix in TITLE_PREFIXES {
        if title.len() >= prefix.len()
            && title.is_char_boundary(prefix.len())
            && title[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            title = title[prefix.len()..].trim().to_string();
        }
    }
    for quote in ['"', '\''] {
        if title.len() > 1 && title.starts_with(quote) && title.ends_with(quote) {
            title = title[1..title.len() - 1].to_string();
        }
    }
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Deterministic fallback: strip page markers and boilerplate lead-ins from
/// the snippet, take the first three meaningful words, title-case them. When
/// nothing usable remains the job id's final segment names the quiz.
pub fn fallback_title(snippet: &str, job_id: &str) -> String {
    let cleaned = PAGE_MARKER.replace_all(snippet, "");
    let mut cleaned = strip_leading_junk(&cleaned);
    for lead in POOR_STARTS {
        if cleaned.len() >= lead.len()
            && cleaned.is_char_boundary(lead.len())
            && cleaned[..lead.len()].eq_ignore_ascii_case(lead)
        {
            cleaned = strip_leading_junk(&cleaned[lead.len()..]);
        }
    }

    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let mut meaningful: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| w.len() > 2 && w.chars().all(char::is_alphabetic))
        .collect();
    if meaningful.is_empty() {
        meaningful = words;
    }

    let title = meaningful
        .iter()
        .take(3)
        .map(|w| title_case(w))
        .collect::<Vec<_>>()
        .join(" ");

    if title.trim().len() < 3 {
        let suffix = job_id.rsplit('_').next().unwrap_or(job_id);
        format!("Custom Quiz {suffix}")
    } else {
        title
    }
}

fn strip_leading_junk(text: &str) -> String {
    LEADING_JUNK.replace(text.trim(), "").trim().to_string()
}

/// Capitalise a word, keeping acronyms as-is.
fn title_case(word: &str) -> String {
    if !word.is_empty() && word.chars().all(char::is_uppercase) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
