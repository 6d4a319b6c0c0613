//! Query expansion.
//!
//! Widens recall with a bounded set of query variants. Heuristics are the
//! guaranteed floor; an attached completion provider adds rephrasings when
//! the budget allows. The output always starts with the original query and
//! is never empty — expansion failure is invisible to the caller.

use serde_json::Value;
use tracing::debug;

use trawl_providers::{extract_json_array, CompletionProvider, CompletionRequest};
use trawl_text::{significant_tokens, DetectedLanguage};

use crate::budget::Budget;
use crate::rules::RuleSet;

/// Word count above which a truncation variant is produced.
const TRUNCATE_AT: usize = 6;

/// System prompt for LLM-assisted expansion, ported from the production
/// prompt: strict JSON array output, bilingual variants encouraged.
const EXPANSION_SYSTEM: &str = "You produce only JSON arrays of search queries. \
Always include at least one Arabic and one English variant if the question is \
not already bilingual.";

/// Expand a query into an ordered, case-insensitively deduplicated list of
/// at most `1 + max_extra` variants, the original first.
pub async fn expand(
    query: &str,
    language: DetectedLanguage,
    rules: &RuleSet,
    provider: Option<&dyn CompletionProvider>,
    budget: &Budget,
    max_extra: usize,
) -> Vec<String> {
    // Brand questions get the curated set; generic heuristics produce
    // dictionary-style variants that hurt recall for brand names.
    if rules.is_brand_intent(query) {
        return brand_expansions(query, rules, max_extra);
    }

    let heuristics = heuristic_expansions(query, rules, max_extra);

    let Some(provider) = provider else {
        return heuristics;
    };
    if !provider.is_available() || !budget.admit() {
        return heuristics;
    }

    match llm_expansions(query, language, rules, provider, budget).await {
        Some(phrases) => {
            let mut merged = vec![query.trim().to_string()];
            merged.extend(phrases);
            merged.extend(heuristics.into_iter().skip(1));
            dedup_cap(merged, max_extra)
        }
        None => heuristics,
    }
}

/// Heuristic variants: reversed word order, suffix stripping, truncation,
/// and synonym injection keyed by topic words. Always non-empty.
pub fn heuristic_expansions(query: &str, rules: &RuleSet, max_extra: usize) -> Vec<String> {
    let original = query.trim().to_string();
    let mut out = vec![original.clone()];

    let words: Vec<&str> = original.split_whitespace().collect();
    if words.len() > 1 {
        let mut reversed = words.clone();
        reversed.reverse();
        out.push(reversed.join(" "));
    }

    let stripped = strip_suffixes(&words);
    if stripped != original {
        out.push(stripped);
    }

    if words.len() > TRUNCATE_AT {
        out.push(words[..TRUNCATE_AT].join(" "));
    }

    let tokens = significant_tokens(&original, 12);
    for rule in &rules.synonyms {
        if tokens.contains(&rule.topic) {
            for synonym in &rule.synonyms {
                out.push(format!("{original} {synonym}"));
            }
        }
    }

    dedup_cap(out, max_extra)
}

fn brand_expansions(query: &str, rules: &RuleSet, max_extra: usize) -> Vec<String> {
    let original = query.trim().to_string();
    let brand = rules.brand_terms(&original).join(" ");
    let mut out = vec![original];
    for suffix in &rules.brand_expansions {
        if brand.is_empty() {
            out.push(suffix.clone());
        } else {
            out.push(format!("{brand} {suffix}"));
        }
    }
    dedup_cap(out, max_extra)
}

async fn llm_expansions(
    query: &str,
    language: DetectedLanguage,
    rules: &RuleSet,
    provider: &dyn CompletionProvider,
    budget: &Budget,
) -> Option<Vec<String>> {
    let user = format!(
        "Question language: {}. Original: {query}\n\
         Rewrite the user's question into up to 4 concise search queries. \
         Provide synonyms, rephrasings, and a translation to the other \
         language (English/Arabic) if helpful. Return a JSON array of \
         strings only.",
        language.tag()
    );
    let request = CompletionRequest::new(EXPANSION_SYSTEM, user).with_temperature(0.0);

    let raw = match budget.bound(provider.complete(request)).await? {
        Ok(raw) => raw,
        Err(err) => {
            debug!("expansion provider failed, using heuristics: {err}");
            return None;
        }
    };

    let array = extract_json_array(&raw)?;
    let values: Vec<Value> = serde_json::from_str(array).ok()?;
    Some(
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && !rules.is_denylisted_expansion(s))
            .collect(),
    )
}

fn strip_suffixes(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| {
            if w.chars().count() > 4 {
                for suffix in ["ing", "es", "ed", "s"] {
                    if let Some(base) = w.strip_suffix(suffix) {
                        if base.chars().count() >= 3 {
                            return base.to_string();
                        }
                    }
                }
            }
            (*w).to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn dedup_cap(candidates: Vec<String>, max_extra: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for candidate in candidates {
        let key = candidate.to_lowercase();
        if candidate.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(candidate);
        if out.len() >= 1 + max_extra {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use trawl_providers::{ProviderError, Result as ProviderResult};
    use trawl_text::detect_language;

    use super::*;

    struct FixedCompletions {
        output: std::result::Result<String, ()>,
    }

    #[async_trait]
    impl CompletionProvider for FixedCompletions {
        fn name(&self) -> &str {
            "fixed"
        }

        fn default_model(&self) -> &str {
            "stub-model"
        }

        async fn complete(&self, _request: CompletionRequest) -> ProviderResult<String> {
            match &self.output {
                Ok(raw) => Ok(raw.clone()),
                Err(()) => Err(ProviderError::ApiRequest("down".to_string())),
            }
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn heuristics_start_with_original_and_never_empty() {
        let rules = RuleSet::default();
        let out = heuristic_expansions("diesel supply terms", &rules, 4);
        assert_eq!(out[0], "diesel supply terms");
        assert!(out.len() > 1);
        assert!(out.len() <= 5);
        assert!(out.contains(&"terms supply diesel".to_string()));
    }

    #[tokio::test]
    async fn single_word_query_still_expands_or_survives() {
        let rules = RuleSet::default();
        let out = heuristic_expansions("diesel", &rules, 4);
        assert_eq!(out[0], "diesel");
        // Synonym injection fires for the diesel topic word.
        assert!(out.iter().any(|e| e.contains("fuel supply")));
    }

    #[tokio::test]
    async fn brand_intent_uses_curated_set() {
        let rules = RuleSet::default();
        let budget = Budget::start(1_000);
        let out = expand(
            "what does example corp do",
            detect_language("what does example corp do"),
            &rules,
            None,
            &budget,
            4,
        )
        .await;
        assert_eq!(out[0], "what does example corp do");
        assert!(out.contains(&"example corp about us".to_string()));
        assert!(out.len() <= 5);
    }

    #[tokio::test]
    async fn llm_phrases_merge_after_original() {
        let rules = RuleSet::default();
        let budget = Budget::start(1_000);
        let provider = FixedCompletions {
            output: Ok("[\"diesel fuel agreements\", \"definition of diesel\"]".to_string()),
        };
        let out = expand(
            "diesel contracts",
            detect_language("diesel contracts"),
            &rules,
            Some(&provider),
            &budget,
            4,
        )
        .await;
        assert_eq!(out[0], "diesel contracts");
        assert_eq!(out[1], "diesel fuel agreements");
        assert!(out.iter().all(|e| !e.contains("definition")));
        assert!(out.len() <= 5);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_heuristics() {
        let rules = RuleSet::default();
        let budget = Budget::start(1_000);
        let provider = FixedCompletions { output: Err(()) };
        let out = expand(
            "diesel contracts",
            detect_language("diesel contracts"),
            &rules,
            Some(&provider),
            &budget,
            4,
        )
        .await;
        assert_eq!(out, heuristic_expansions("diesel contracts", &RuleSet::default(), 4));
    }

    #[tokio::test]
    async fn garbage_output_falls_back_to_heuristics() {
        let rules = RuleSet::default();
        let budget = Budget::start(1_000);
        let provider = FixedCompletions {
            output: Ok("I cannot answer that.".to_string()),
        };
        let out = expand(
            "diesel contracts",
            detect_language("diesel contracts"),
            &rules,
            Some(&provider),
            &budget,
            4,
        )
        .await;
        assert_eq!(out[0], "diesel contracts");
        assert!(!out.is_empty());
    }
}
