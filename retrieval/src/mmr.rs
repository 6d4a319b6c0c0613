//! Diversified final selection via Maximal Marginal Relevance.
//!
//! Greedy: each round picks the candidate maximizing
//! `λ·relevance − (1−λ)·max_similarity_to_selected`, with similarity being
//! token-set Jaccard overlap. Deterministic: equal marginal scores resolve
//! to the earlier candidate.

use std::collections::HashSet;

use trawl_corpus::DocHit;
use trawl_text::{similarity_token_set, token_jaccard};

use crate::rescore::ScoredCandidate;

/// Select up to `k` hits balancing relevance and novelty.
///
/// Candidates must arrive sorted by composite score descending. Falls back
/// to the plain top-`k` when selection produces nothing.
pub fn mmr_select(candidates: &[ScoredCandidate], k: usize, lambda: f32) -> Vec<DocHit> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let token_sets: Vec<HashSet<String>> = candidates
        .iter()
        .map(|c| similarity_token_set(c.hit.display_text()))
        .collect();

    let mut selected: Vec<usize> = Vec::new();
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best: Option<(f32, usize)> = None;
        for (slot, &idx) in remaining.iter().enumerate() {
            let max_sim = selected
                .iter()
                .map(|&s| token_jaccard(&token_sets[idx], &token_sets[s]))
                .fold(0.0f32, f32::max);
            let marginal = lambda * candidates[idx].score - (1.0 - lambda) * max_sim;
            let better = match best {
                Some((best_score, _)) => marginal > best_score,
                None => true,
            };
            if better {
                best = Some((marginal, slot));
            }
        }
        let Some((_, slot)) = best else { break };
        selected.push(remaining.remove(slot));
    }

    if selected.is_empty() {
        return candidates
            .iter()
            .take(k)
            .map(|c| {
                let mut hit = c.hit.clone();
                hit.score = c.score;
                hit
            })
            .collect();
    }

    selected
        .into_iter()
        .map(|idx| {
            let mut hit = candidates[idx].hit.clone();
            hit.score = candidates[idx].score;
            hit
        })
        .collect()
}
