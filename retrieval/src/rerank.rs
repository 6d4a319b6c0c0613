//! Optional LLM rerank of the selected hits.
//!
//! Strictly best-effort: timeout, malformed output, and provider errors
//! all return the input order unchanged. Entries the model omits keep
//! their original relative order after the reranked ones.

use ordered_float::OrderedFloat;
use serde::Deserialize;
use tracing::debug;

use trawl_corpus::DocHit;
use trawl_providers::{extract_json_array, CompletionProvider, CompletionRequest};

use crate::budget::Budget;

/// Per-passage snippet cap in the rerank prompt.
const SNIPPET_CHARS: usize = 1200;

const RERANK_SYSTEM: &str =
    "Return strict JSON array of {index:int, score:float in [0,1]} sorted by relevance.";

#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: i64,
    #[serde(default)]
    score: f32,
}

/// Ask the completion provider to reorder `hits` by relevance to `query`.
pub async fn llm_rerank(
    provider: &dyn CompletionProvider,
    query: &str,
    hits: Vec<DocHit>,
    budget: &Budget,
) -> Vec<DocHit> {
    if hits.is_empty() || !provider.is_available() || !budget.admit() {
        return hits;
    }

    let passages = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{i}] {}", snip(hit.display_text())))
        .collect::<Vec<_>>()
        .join("\n\n");
    let request = CompletionRequest::new(
        RERANK_SYSTEM,
        format!("Query: {query}\n\nPassages:\n{passages}"),
    )
    .with_temperature(0.0);

    let raw = match budget.bound(provider.complete(request)).await {
        Some(Ok(raw)) => raw,
        Some(Err(err)) => {
            debug!("rerank provider failed, keeping input order: {err}");
            return hits;
        }
        None => return hits,
    };

    match parse_order(&raw, hits.len()) {
        Some(order) => apply_order(hits, order),
        None => hits,
    }
}

/// Parse the model output into a ranked list of input indices.
fn parse_order(raw: &str, len: usize) -> Option<Vec<usize>> {
    let array = extract_json_array(raw)?;
    let entries: Vec<RerankEntry> = serde_json::from_str(array).ok()?;
    let mut valid: Vec<(usize, f32)> = entries
        .into_iter()
        .filter_map(|e| {
            let index = usize::try_from(e.index).ok()?;
            (index < len).then_some((index, e.score))
        })
        .collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by_key(|(_, score)| OrderedFloat(-score));
    let mut order: Vec<usize> = Vec::new();
    for (index, _) in valid {
        if !order.contains(&index) {
            order.push(index);
        }
    }
    Some(order)
}

fn apply_order(hits: Vec<DocHit>, order: Vec<usize>) -> Vec<DocHit> {
    let mut slots: Vec<Option<DocHit>> = hits.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(slots.len());
    for index in order {
        if let Some(hit) = slots[index].take() {
            out.push(hit);
        }
    }
    for slot in slots {
        if let Some(hit) = slot {
            out.push(hit);
        }
    }
    out
}

fn snip(text: &str) -> String {
    text.replace('\n', " ").chars().take(SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use trawl_providers::{ProviderError, Result as ProviderResult};

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

    fn hits() -> Vec<DocHit> {
        vec![
            DocHit::new("a", 0.3).with_text("alpha"),
            DocHit::new("b", 0.2).with_text("beta"),
            DocHit::new("c", 0.1).with_text("gamma"),
        ]
    }

    fn ids(hits: &[DocHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[tokio::test]
    async fn reorders_by_model_scores() {
        let provider = FixedCompletions {
            output: Ok("[{\"index\":2,\"score\":0.9},{\"index\":0,\"score\":0.4}]".to_string()),
        };
        let budget = Budget::start(1_000);
        let out = llm_rerank(&provider, "q", hits(), &budget).await;
        // Omitted index 1 keeps its position after the reranked entries.
        assert_eq!(ids(&out), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn provider_error_keeps_input_order() {
        let provider = FixedCompletions { output: Err(()) };
        let budget = Budget::start(1_000);
        let out = llm_rerank(&provider, "q", hits(), &budget).await;
        assert_eq!(ids(&out), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn malformed_output_keeps_input_order() {
        let provider = FixedCompletions {
            output: Ok("the most relevant is the second one".to_string()),
        };
        let budget = Budget::start(1_000);
        let out = llm_rerank(&provider, "q", hits(), &budget).await;
        assert_eq!(ids(&out), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn out_of_range_indices_are_ignored() {
        let provider = FixedCompletions {
            output: Ok("[{\"index\":9,\"score\":1.0},{\"index\":1,\"score\":0.8}]".to_string()),
        };
        let budget = Budget::start(1_000);
        let out = llm_rerank(&provider, "q", hits(), &budget).await;
        assert_eq!(ids(&out), vec!["b", "a", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_skips_the_call() {
        let provider = FixedCompletions {
            output: Ok("[{\"index\":2,\"score\":0.9}]".to_string()),
        };
        let budget = Budget::start(50);
        tokio::time::advance(std::time::Duration::from_millis(51)).await;
        let out = llm_rerank(&provider, "q", hits(), &budget).await;
        assert_eq!(ids(&out), vec!["a", "b", "c"]);
        assert!(budget.hit());
    }
}
