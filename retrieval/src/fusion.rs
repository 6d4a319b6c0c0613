//! Reciprocal Rank Fusion.
//!
//! The only place scores from different strategies meet. Each list
//! contributes `1 / (K + rank + 1)` per item with `K = 60`, which dampens
//! low ranks; contributions are summed per id, sorted descending, and
//! truncated to the fusion pool size. Ties break by first-seen order so the
//! output is deterministic.

use std::collections::HashMap;

use ordered_float::OrderedFloat;

use trawl_corpus::DocHit;

/// Rank-dampening constant.
pub const RRF_K: f32 = 60.0;

/// A fused candidate: the first-seen hit plus its summed RRF score.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    /// First-seen hit for this id; text and metadata are kept from the
    /// first list that produced it.
    pub hit: DocHit,

    /// Summed reciprocal-rank score.
    pub rrf: f32,
}

/// Fuse ranked lists into at most `pool` candidates.
pub fn rrf_fuse(lists: &[Vec<DocHit>], pool: usize) -> Vec<FusedCandidate> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut meta: HashMap<String, DocHit> = HashMap::new();
    let mut order = 0usize;

    for list in lists {
        for (rank, hit) in list.iter().enumerate() {
            *scores.entry(hit.id.clone()).or_insert(0.0) += 1.0 / (RRF_K + rank as f32 + 1.0);
            first_seen.entry(hit.id.clone()).or_insert_with(|| {
                order += 1;
                order
            });
            meta.entry(hit.id.clone()).or_insert_with(|| hit.clone());
        }
    }

    let mut fused: Vec<(String, f32, usize)> = scores
        .into_iter()
        .map(|(id, score)| {
            let seen = first_seen.get(&id).copied().unwrap_or(usize::MAX);
            (id, score, seen)
        })
        .collect();
    // Descending score, ascending first-seen order on ties.
    fused.sort_by_key(|(_, score, seen)| (OrderedFloat(-score), *seen));
    fused.truncate(pool);

    fused
        .into_iter()
        .filter_map(|(id, rrf, _)| {
            let hit = meta.remove(&id)?;
            Some(FusedCandidate { hit, rrf })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn hit(id: &str) -> DocHit {
        DocHit::new(id, 0.0).with_text(format!("text for {id}"))
    }

    #[test]
    fn two_top_ranks_beat_one() {
        // A = [x, y], B = [x, z]: x leads.
        let lists = vec![vec![hit("x"), hit("y")], vec![hit("x"), hit("z")]];
        let fused = rrf_fuse(&lists, 10);
        assert_eq!(fused[0].hit.id, "x");
        let expected = 2.0 / (RRF_K + 1.0);
        assert!((fused[0].rrf - expected).abs() < 1e-6);
    }

    #[test]
    fn rank_zero_twice_beats_rank_zero_plus_rank_ten() {
        // x: rank 0 in two lists. w: rank 0 in one list, rank 10 in another.
        let list_a = vec![hit("x")];
        let list_b = vec![hit("x")];
        let list_c = vec![hit("w")];
        let mut list_d: Vec<DocHit> = (0..10).map(|i| hit(&format!("f{i}"))).collect();
        list_d.push(hit("w"));
        let fused = rrf_fuse(&[list_a, list_b, list_c, list_d], 20);
        let pos_x = fused.iter().position(|c| c.hit.id == "x").unwrap();
        let pos_w = fused.iter().position(|c| c.hit.id == "w").unwrap();
        assert!(pos_x < pos_w);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let lists = vec![vec![hit("p")], vec![hit("q")]];
        let fused = rrf_fuse(&lists, 10);
        assert_eq!(fused[0].hit.id, "p");
        assert_eq!(fused[1].hit.id, "q");
    }

    #[test]
    fn first_seen_text_is_kept() {
        let first = DocHit::new("x", 0.9).with_text("first text");
        let second = DocHit::new("x", 0.1).with_text("second text");
        let fused = rrf_fuse(&[vec![first], vec![second]], 10);
        assert_eq!(fused[0].hit.text, "first text");
    }

    #[test]
    fn truncates_to_pool() {
        let lists = vec![(0..20).map(|i| hit(&format!("d{i}"))).collect::<Vec<_>>()];
        let fused = rrf_fuse(&lists, 5);
        assert_eq!(fused.len(), 5);
        assert_eq!(fused[0].hit.id, "d0");
    }

    #[test]
    fn empty_input_fuses_to_nothing() {
        assert!(rrf_fuse(&[], 10).is_empty());
        assert!(rrf_fuse(&[Vec::new()], 10).is_empty());
    }
}
