//! Structured answer synthesis.
//!
//! Two paths, one shape: a completion provider constrained to a fixed JSON
//! schema, and a deterministic fallback that sentence-splits the selected
//! hits and buckets them by query overlap. The fallback also covers the
//! zero-hit case with a neutral no-context answer, bilingual to match the
//! query's script.

use serde::{Deserialize, Serialize};
use tracing::debug;

use trawl_corpus::DocHit;
use trawl_providers::{CompletionProvider, CompletionRequest};
use trawl_text::{significant_tokens, DetectedLanguage};

use crate::budget::Budget;

/// Field caps applied to both synthesis paths.
const TITLE_CHARS: usize = 120;
const SUMMARY_CHARS: usize = 1_000;
const SECTION_CHARS: usize = 2_000;
const MAX_SECTIONS: usize = 6;

/// Sentences kept per deterministic section.
const SECTION_SENTENCES: usize = 5;

const ANSWER_SYSTEM: &str = "You answer using ONLY the provided context. Respond \
with one JSON object: {\"title\": string, \"summary\": string, \"sections\": \
[{\"heading\": string, \"content\": string}], \"sources\": [string]}. No prose \
outside the JSON. If the context is insufficient, say so in the summary.";

/// One titled block of a structured answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSection {
    /// Section heading.
    pub heading: String,

    /// Section body.
    pub content: String,
}

/// The structured answer shape produced by both synthesis paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    /// Short answer title.
    pub title: String,

    /// One-paragraph summary.
    pub summary: String,

    /// Titled detail sections.
    pub sections: Vec<AnswerSection>,

    /// Ids of the hits the answer is grounded on.
    pub sources: Vec<String>,
}

/// Build a structured answer from the final selection.
pub async fn synthesize(
    provider: Option<&dyn CompletionProvider>,
    query: &str,
    language: DetectedLanguage,
    hits: &[DocHit],
    budget: &Budget,
) -> StructuredAnswer {
    if hits.is_empty() {
        return no_context(query, language);
    }

    if let Some(provider) = provider {
        if provider.is_available() && budget.admit() {
            if let Some(answer) = llm_answer(provider, query, hits, budget).await {
                return answer;
            }
        }
    }

    deterministic_answer(query, hits)
}

/// The neutral answer for an empty selection.
pub fn no_context(query: &str, language: DetectedLanguage) -> StructuredAnswer {
    let summary = if language.is_arabic() {
        "لا يوجد سياق متاح."
    } else {
        "No relevant context available."
    };
    StructuredAnswer {
        title: truncate_chars(query.trim(), TITLE_CHARS),
        summary: summary.to_string(),
        sections: Vec::new(),
        sources: Vec::new(),
    }
}

async fn llm_answer(
    provider: &dyn CompletionProvider,
    query: &str,
    hits: &[DocHit],
    budget: &Budget,
) -> Option<StructuredAnswer> {
    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}", i + 1, hit.display_text()))
        .collect::<Vec<_>>()
        .join("\n---\n");
    let request = CompletionRequest::new(
        ANSWER_SYSTEM,
        format!("Question: {query}\n\nContext:\n{context}"),
    )
    .with_temperature(0.0);

    let raw = match budget.bound(provider.complete(request)).await? {
        Ok(raw) => raw,
        Err(err) => {
            debug!("answer provider failed, using deterministic path: {err}");
            return None;
        }
    };

    let object = extract_json_object(&raw)?;
    let parsed: LooseAnswer = serde_json::from_str(object).ok()?;
    if parsed.title.trim().is_empty() && parsed.summary.trim().is_empty() {
        return None;
    }

    let mut sections: Vec<AnswerSection> = parsed
        .sections
        .into_iter()
        .filter(|s| !s.content.trim().is_empty())
        .map(|s| AnswerSection {
            heading: truncate_chars(&s.heading, TITLE_CHARS),
            content: truncate_chars(&s.content, SECTION_CHARS),
        })
        .collect();
    sections.truncate(MAX_SECTIONS);

    let sources = if parsed.sources.is_empty() {
        hits.iter().map(|h| h.id.clone()).collect()
    } else {
        parsed.sources
    };

    Some(StructuredAnswer {
        title: truncate_chars(&parsed.title, TITLE_CHARS),
        summary: truncate_chars(&parsed.summary, SUMMARY_CHARS),
        sections,
        sources,
    })
}

/// Deterministic path: sentence-split the hits, dedup near-identical lines,
/// bucket by query-token overlap.
fn deterministic_answer(query: &str, hits: &[DocHit]) -> StructuredAnswer {
    let query_tokens = significant_tokens(query, 12);

    let mut seen_keys: Vec<String> = Vec::new();
    let mut overview: Vec<String> = Vec::new();
    let mut details: Vec<String> = Vec::new();

    for hit in hits {
        for sentence in split_sentences(hit.display_text()) {
            let key: String = sentence.to_lowercase().chars().take(80).collect();
            if seen_keys.contains(&key) {
                continue;
            }
            seen_keys.push(key);

            let lower = sentence.to_lowercase();
            let overlaps = query_tokens.iter().any(|t| lower.contains(t.as_str()));
            let bucket = if overlaps { &mut overview } else { &mut details };
            if bucket.len() < SECTION_SENTENCES {
                bucket.push(sentence);
            }
        }
    }

    let summary = if overview.is_empty() {
        details
            .first()
            .cloned()
            .unwrap_or_else(|| "No relevant context available.".to_string())
    } else {
        overview.join(" ")
    };

    let mut sections = Vec::new();
    if !overview.is_empty() {
        sections.push(AnswerSection {
            heading: "Overview".to_string(),
            content: truncate_chars(&overview.join(" "), SECTION_CHARS),
        });
    }
    if !details.is_empty() {
        sections.push(AnswerSection {
            heading: "Details".to_string(),
            content: truncate_chars(&details.join(" "), SECTION_CHARS),
        });
    }

    let mut sources: Vec<String> = Vec::new();
    for hit in hits {
        if !sources.contains(&hit.id) {
            sources.push(hit.id.clone());
        }
    }

    StructuredAnswer {
        title: truncate_chars(query.trim(), TITLE_CHARS),
        summary: truncate_chars(&summary, SUMMARY_CHARS),
        sections,
        sources,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LooseAnswer {
    title: String,
    summary: String,
    sections: Vec<LooseSection>,
    sources: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LooseSection {
    heading: String,
    content: String,
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?', '\u{061f}'])
        .map(str::trim)
        .filter(|s| s.chars().filter(|c| c.is_alphanumeric()).count() >= 3)
        .map(str::to_string)
        .collect()
}

fn truncate_chars(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}
