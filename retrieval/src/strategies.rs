//! Candidate-generating strategies.
//!
//! Each strategy returns ranked lists of [`DocHit`]s, one list per unit of
//! evidence (an expansion, a source), ordered by its own criterion. Lists
//! are the fusion input; reordering inside one before fusion would corrupt
//! the rank evidence. Strategies never error: provider and store failures
//! are logged and contribute empty lists, and the budget gates entry into
//! every unit of work.

use tracing::debug;

use trawl_corpus::{CorpusStore, DocHit, LocalIndexCache, SchemaCache, ScopeFilter};
use trawl_providers::{EmbeddingProvider, EmbeddingRequest};
use trawl_text::significant_tokens;

use crate::budget::Budget;
use crate::rules::RuleSet;

/// Significant tokens taken per expansion for pattern search.
const LEXICAL_TOKENS: usize = 6;

/// Per-source fetch size for the keyword prefilter.
const KEYWORD_LIMIT_EACH: usize = 25;

/// Dense vector retrieval: embed each expansion and run a nearest-neighbor
/// query. A failed embedding skips that expansion only.
pub async fn dense_lists(
    provider: Option<&dyn EmbeddingProvider>,
    store: &dyn CorpusStore,
    expansions: &[String],
    scope: &ScopeFilter,
    dense_k: usize,
    budget: &Budget,
) -> Vec<Vec<DocHit>> {
    let Some(provider) = provider else {
        return Vec::new();
    };
    if !provider.is_available() {
        return Vec::new();
    }

    let mut lists = Vec::new();
    for expansion in expansions {
        if !budget.admit() {
            break;
        }
        let embedding = match budget
            .bound(provider.embed(EmbeddingRequest::new(expansion)))
            .await
        {
            Some(Ok(response)) => response.embedding,
            Some(Err(err)) => {
                debug!("embedding failed for expansion, skipping: {err}");
                continue;
            }
            None => break,
        };

        match budget
            .bound(store.similarity_search(&embedding, scope, dense_k))
            .await
        {
            Some(Ok(hits)) if !hits.is_empty() => lists.push(hits),
            Some(Ok(_)) => {}
            Some(Err(err)) => debug!("dense store query failed: {err}"),
            None => break,
        }
    }
    lists
}

/// Lexical pattern retrieval: substring search over the significant tokens
/// of each expansion, ordered by content length descending. Pattern stores
/// have no score of their own, so each hit carries its reciprocal rank
/// `1 / (rank + 1)` as the stage-local score.
pub async fn lexical_lists(
    store: &dyn CorpusStore,
    expansions: &[String],
    scope: &ScopeFilter,
    lexical_k: usize,
    budget: &Budget,
) -> Vec<Vec<DocHit>> {
    let mut lists = Vec::new();
    for expansion in expansions {
        if !budget.admit() {
            break;
        }
        let tokens = significant_tokens(expansion, LEXICAL_TOKENS);
        if tokens.is_empty() {
            continue;
        }
        match budget
            .bound(store.pattern_search(&tokens, scope, lexical_k))
            .await
        {
            Some(Ok(hits)) if !hits.is_empty() => {
                lists.push(
                    hits.into_iter()
                        .enumerate()
                        .map(|(rank, mut hit)| {
                            hit.score = 1.0 / (rank as f32 + 1.0);
                            hit
                        })
                        .collect(),
                );
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => debug!("lexical store query failed: {err}"),
            None => break,
        }
    }
    lists
}

/// Keyword prefilter: when curated domain keywords appear in the query,
/// run targeted pattern searches per source with a fixed per-source
/// confidence. Skipped entirely when no keyword matches.
pub async fn keyword_lists(
    store: &dyn CorpusStore,
    query: &str,
    rules: &RuleSet,
    scope: &ScopeFilter,
    budget: &Budget,
) -> Vec<Vec<DocHit>> {
    let keywords = rules.prefilter_matches(query);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut lists = Vec::new();
    for (index, source) in store.sources().iter().enumerate() {
        if !budget.admit() {
            break;
        }
        let confidence = rules.source_confidence(index);
        match budget
            .bound(store.pattern_search_in(source, &keywords, scope, KEYWORD_LIMIT_EACH))
            .await
        {
            Some(Ok(hits)) if !hits.is_empty() => {
                lists.push(
                    hits.into_iter()
                        .map(|mut hit| {
                            hit.score = confidence;
                            hit
                        })
                        .collect(),
                );
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => debug!("keyword prefilter failed for {source}: {err}"),
            None => break,
        }
    }
    lists
}

/// BM25 retrieval: store-native full-text ranking when the capability is
/// present, the local sampled index otherwise. Both agree on the scoring
/// formula.
pub async fn bm25_lists(
    store: &dyn CorpusStore,
    schema: &SchemaCache,
    local_index: &LocalIndexCache,
    query: &str,
    scope: &ScopeFilter,
    lexical_k: usize,
    budget: &Budget,
) -> Vec<Vec<DocHit>> {
    if !budget.admit() {
        return Vec::new();
    }

    let native = match budget.bound(schema.resolve(store)).await {
        Some(Ok(caps)) => caps.full_text,
        Some(Err(err)) => {
            debug!("capability probe failed, using local BM25: {err}");
            false
        }
        None => return Vec::new(),
    };

    if native {
        match budget
            .bound(store.full_text_search(query, scope, lexical_k))
            .await
        {
            Some(Ok(hits)) if !hits.is_empty() => return vec![hits],
            Some(Ok(_)) => return Vec::new(),
            Some(Err(err)) => debug!("native full-text failed, using local BM25: {err}"),
            None => return Vec::new(),
        }
    }

    match budget.bound(local_index.get_or_build(store)).await {
        Some(Ok(index)) => {
            let hits: Vec<DocHit> = index
                .search(query, lexical_k)
                .into_iter()
                .map(|m| DocHit::new(m.id, m.score).with_text(m.text))
                .collect();
            if hits.is_empty() {
                Vec::new()
            } else {
                vec![hits]
            }
        }
        Some(Err(err)) => {
            debug!("local BM25 build failed: {err}");
            Vec::new()
        }
        None => Vec::new(),
    }
}
