//! The hybrid retrieval engine.
//!
//! One struct owns the corpus store, the optional model providers, the
//! rule tables, and the two process-wide caches, and runs the pipeline:
//! expansion, four concurrent strategies, fusion, re-scoring, MMR
//! selection, and the optional rerank — all under one wall-clock budget.

use std::sync::Arc;

use tracing::{debug, info};

use trawl_corpus::{CorpusStore, DocHit, LocalIndexCache, SchemaCache, ScopeFilter};
use trawl_providers::{CompletionProvider, EmbeddingProvider};
use trawl_text::detect_language;

use crate::answer::{synthesize, StructuredAnswer};
use crate::budget::Budget;
use crate::config::HybridConfig;
use crate::error::Result;
use crate::expand;
use crate::fusion::rrf_fuse;
use crate::mmr::mmr_select;
use crate::progress::{Phase, ProgressReporter};
use crate::rerank::llm_rerank;
use crate::rescore::rescore;
use crate::result::{FusedScore, HybridResult};
use crate::rules::RuleSet;
use crate::strategies;

/// Budget-bounded hybrid retrieval over one corpus store.
pub struct HybridRetrieval {
    store: Arc<dyn CorpusStore>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    completions: Option<Arc<dyn CompletionProvider>>,
    rules: RuleSet,
    defaults: HybridConfig,
    schema: SchemaCache,
    local_index: LocalIndexCache,
    progress: Option<ProgressReporter>,
}

impl HybridRetrieval {
    /// Start building an engine over a store.
    pub fn builder(store: Arc<dyn CorpusStore>) -> HybridRetrievalBuilder {
        HybridRetrievalBuilder::new(store)
    }

    /// Run one retrieval call with the engine's default configuration.
    pub async fn search(&self, query: &str, scope: &ScopeFilter) -> Result<HybridResult> {
        self.search_with(query, scope, self.defaults.clone()).await
    }

    /// Run one retrieval call with per-call configuration overrides.
    ///
    /// Errors only on invalid configuration. Every other failure mode
    /// degrades the returned [`HybridResult`] instead.
    pub async fn search_with(
        &self,
        query: &str,
        scope: &ScopeFilter,
        config: HybridConfig,
    ) -> Result<HybridResult> {
        config.validate()?;
        let budget = Budget::start(config.budget_ms);
        let language = detect_language(query);
        info!("hybrid retrieval start: {query:?} ({})", language.tag());

        let expansions = expand::expand(
            query,
            language,
            &self.rules,
            self.completions.as_deref(),
            &budget,
            config.expansion_count,
        )
        .await;
        self.report(Phase::Expansions, expansions.len());

        let store = self.store.as_ref();
        let (dense, lexical, keyword, bm25) = tokio::join!(
            strategies::dense_lists(
                self.embeddings.as_deref(),
                store,
                &expansions,
                scope,
                config.dense_k,
                &budget,
            ),
            strategies::lexical_lists(store, &expansions, scope, config.lexical_k, &budget),
            async {
                if config.keyword_prefilter {
                    strategies::keyword_lists(store, query, &self.rules, scope, &budget).await
                } else {
                    Vec::new()
                }
            },
            async {
                if config.use_bm25 {
                    strategies::bm25_lists(
                        store,
                        &self.schema,
                        &self.local_index,
                        query,
                        scope,
                        config.lexical_k,
                        &budget,
                    )
                    .await
                } else {
                    Vec::new()
                }
            },
        );
        self.report(Phase::Dense, hits_in(&dense));
        self.report(Phase::Lexical, hits_in(&lexical));
        self.report(Phase::KeywordPrefilter, hits_in(&keyword));
        self.report(Phase::Bm25, hits_in(&bm25));

        let mut lists = dense;
        lists.extend(lexical);
        lists.extend(keyword);
        lists.extend(bm25);

        // Every enabled strategy came back empty: raw BM25 hits, if any,
        // become a synthetic single ranked list.
        if lists.iter().all(Vec::is_empty) && !config.use_bm25 {
            lists = strategies::bm25_lists(
                store,
                &self.schema,
                &self.local_index,
                query,
                scope,
                config.lexical_k,
                &budget,
            )
            .await;
        }

        let fused_candidates = rrf_fuse(&lists, config.dense_fuse);
        self.report(Phase::Fusion, fused_candidates.len());
        let fused: Vec<FusedScore> = fused_candidates
            .iter()
            .map(|c| FusedScore {
                id: c.hit.id.clone(),
                score: c.rrf,
            })
            .collect();

        let scored = rescore(
            fused_candidates,
            query,
            &self.rules,
            config.prefer_domain.as_deref(),
            config.final_k,
        );
        let mut selected = mmr_select(&scored, config.final_k, config.mmr_lambda);

        self.backfill_text(&mut selected, &budget).await;

        if config.llm_rerank {
            if let Some(completions) = self.completions.as_deref() {
                selected = llm_rerank(completions, query, selected, &budget).await;
            }
        }
        self.report(Phase::Selection, selected.len());

        let budget_hit = budget.hit();
        let elapsed_ms = budget.elapsed_ms();
        info!(
            "hybrid retrieval done: {} selected in {elapsed_ms}ms (budget_hit: {budget_hit})",
            selected.len()
        );

        Ok(HybridResult {
            query: query.to_string(),
            language,
            expansions,
            selected,
            fused,
            budget_hit,
            elapsed_ms,
        })
    }

    /// Build a structured answer from a finished retrieval call.
    ///
    /// Runs under its own budget; an exhausted or absent completion
    /// provider yields the deterministic answer.
    pub async fn answer(&self, result: &HybridResult) -> StructuredAnswer {
        let budget = Budget::start(self.defaults.budget_ms);
        synthesize(
            self.completions.as_deref(),
            &result.query,
            result.language,
            &result.selected,
            &budget,
        )
        .await
    }

    /// Fetch missing text for selected hits by id, best-effort.
    async fn backfill_text(&self, selected: &mut [DocHit], budget: &Budget) {
        let missing: Vec<String> = selected
            .iter()
            .filter(|h| h.display_text().is_empty())
            .map(|h| h.id.clone())
            .collect();
        if missing.is_empty() || !budget.admit() {
            return;
        }
        match budget.bound(self.store.fetch_by_ids(&missing)).await {
            Some(Ok(rows)) => {
                for hit in selected.iter_mut() {
                    if hit.display_text().is_empty() {
                        if let Some(row) = rows.iter().find(|r| r.id == hit.id) {
                            hit.text = row.text.clone();
                        }
                    }
                }
            }
            Some(Err(err)) => debug!("text backfill failed: {err}"),
            None => {}
        }
    }

    fn report(&self, phase: Phase, count: usize) {
        if let Some(progress) = &self.progress {
            progress.report(phase, count);
        }
    }
}

/// Builder for [`HybridRetrieval`].
pub struct HybridRetrievalBuilder {
    store: Arc<dyn CorpusStore>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    completions: Option<Arc<dyn CompletionProvider>>,
    rules: RuleSet,
    defaults: HybridConfig,
    local_index: LocalIndexCache,
    progress: Option<ProgressReporter>,
}

impl HybridRetrievalBuilder {
    /// Create a builder with default rules and configuration.
    pub fn new(store: Arc<dyn CorpusStore>) -> Self {
        Self {
            store,
            embeddings: None,
            completions: None,
            rules: RuleSet::default(),
            defaults: HybridConfig::default(),
            local_index: LocalIndexCache::new(),
            progress: None,
        }
    }

    /// Attach an embedding provider for dense retrieval.
    pub fn with_embeddings(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings = Some(provider);
        self
    }

    /// Attach a completion provider for expansion, rerank, and answers.
    pub fn with_completions(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completions = Some(provider);
        self
    }

    /// Replace the heuristic rule tables.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the default per-call configuration.
    pub fn with_defaults(mut self, defaults: HybridConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Replace the local BM25 index cache (custom TTL or sample cap).
    pub fn with_local_index(mut self, local_index: LocalIndexCache) -> Self {
        self.local_index = local_index;
        self
    }

    /// Attach a progress reporter.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Validate the defaults and build the engine.
    pub fn build(self) -> Result<HybridRetrieval> {
        self.defaults.validate()?;
        Ok(HybridRetrieval {
            store: self.store,
            embeddings: self.embeddings,
            completions: self.completions,
            rules: self.rules,
            defaults: self.defaults,
            schema: SchemaCache::new(),
            local_index: self.local_index,
            progress: self.progress,
        })
    }
}

fn hits_in(lists: &[Vec<DocHit>]) -> usize {
    lists.iter().map(Vec::len).sum()
}
