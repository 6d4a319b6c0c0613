//! Heuristic re-scoring of fused candidates.
//!
//! Applied once per candidate between fusion and selection. Every
//! adjustment is additive, bounded by its weight in the rule set, and
//! driven by data, so no single signal can dominate the fused score and
//! the tables stay tunable without touching this code.

use ordered_float::OrderedFloat;
use tracing::debug;

use trawl_corpus::DocHit;
use trawl_text::significant_tokens;

use crate::fusion::FusedCandidate;
use crate::rules::RuleSet;

/// Floor below which the relevance filter disengages rather than
/// under-return.
const FILTER_FLOOR: usize = 4;

/// A candidate with its composite working score.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    /// The underlying hit.
    pub hit: DocHit,

    /// Fused score plus heuristic adjustments.
    pub score: f32,

    /// Fraction of query tokens present in the text.
    pub(crate) overlap: f32,
}

impl ScoredCandidate {
    /// Query-token overlap fraction, used by the relevance filter.
    pub fn overlap(&self) -> f32 {
        self.overlap
    }
}

/// Re-score fused candidates and apply the final relevance filter.
///
/// The filter removes candidates with zero token overlap unless an
/// intent-specific override applies, but disengages entirely when it would
/// leave fewer than `max(FILTER_FLOOR, final_k)` candidates.
pub fn rescore(
    candidates: Vec<FusedCandidate>,
    query: &str,
    rules: &RuleSet,
    prefer_domain: Option<&str>,
    final_k: usize,
) -> Vec<ScoredCandidate> {
    let query_tokens = significant_tokens(query, 12);
    let brand_intent = rules.is_brand_intent(query);
    let brand_terms = if brand_intent {
        rules.brand_terms(query)
    } else {
        Vec::new()
    };
    let ev_intent = rules.has_ev_intent(query);
    let delivery_intent = rules.has_delivery_intent(query);
    let weights = &rules.weights;

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let id = candidate.hit.id.to_lowercase();
            let text = candidate.hit.display_text().to_lowercase();
            let mut score = candidate.rrf;

            // Domain preference is suspended under EV intent so topical
            // relevance is not overridden by domain bias.
            if !ev_intent {
                if let Some(prefix) = prefer_domain {
                    if id.starts_with(&prefix.to_lowercase()) {
                        score += weights.domain;
                    } else if let Some(protocol) = prefix.split("://").next() {
                        if id.starts_with(&format!("{}://", protocol.to_lowercase())) {
                            score += weights.protocol;
                        }
                    }
                }
            }

            if brand_intent {
                if brand_terms.iter().any(|t| id.contains(t) || text.contains(t)) {
                    score += weights.brand;
                }
                if rules.looks_like_email(&text) {
                    score -= weights.email_penalty;
                }
            }

            if delivery_intent
                && rules.delivery_terms.iter().any(|t| text.contains(t.as_str()))
            {
                score += weights.intent;
            }
            if ev_intent
                && (rules.ev_terms.iter().any(|t| text.contains(t.as_str()))
                    || rules.is_ev_id(&id))
            {
                score += weights.intent;
            }

            let overlap = if query_tokens.is_empty() {
                0.0
            } else {
                let matched = query_tokens.iter().filter(|t| text.contains(t.as_str())).count();
                (matched as f32) / (query_tokens.len() as f32)
            };
            score += weights.overlap_cap * overlap;

            score -= rules.noise_penalty(&id, &text);

            ScoredCandidate {
                hit: candidate.hit,
                score,
                overlap,
            }
        })
        .collect();

    // Stable sort keeps fused (first-seen) order on equal scores.
    scored.sort_by_key(|c| OrderedFloat(-c.score));

    let keeps = |c: &ScoredCandidate| c.overlap > 0.0 || (ev_intent && rules.is_ev_id(&c.hit.id));
    let kept = scored.iter().filter(|c| keeps(c)).count();
    let floor = FILTER_FLOOR.max(final_k);
    if kept >= floor {
        scored.retain(keeps);
    } else if kept < scored.len() {
        debug!(
            kept,
            total = scored.len(),
            "relevance filter disengaged to avoid under-returning"
        );
    }
    scored
}
