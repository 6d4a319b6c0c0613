//! BM25 index and scorer.
//!
//! Used two ways: as the local fallback index when the corpus store has no
//! native full-text column, and as the reference formula that store-native
//! ranking has to agree with. Okapi BM25 with `k1 = 1.5`, `b = 0.75` and
//! `idf(t) = ln(1 + (N - df + 0.5) / (df + 0.5))`.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::tokenize::bm25_tokens;

/// Term-frequency saturation.
pub const BM25_K1: f32 = 1.5;

/// Length normalization strength.
pub const BM25_B: f32 = 0.75;

struct IndexedDoc {
    id: String,
    text: String,
    term_frequency: HashMap<String, u32>,
    token_count: f32,
}

/// A scored document returned from [`Bm25Index::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Match {
    /// Document id as supplied at build time.
    pub id: String,

    /// Document text as supplied at build time.
    pub text: String,

    /// BM25 relevance score, strictly positive.
    pub score: f32,
}

/// An in-memory inverted-index-lite over `(id, text)` rows.
pub struct Bm25Index {
    docs: Vec<IndexedDoc>,
    document_frequency: HashMap<String, usize>,
    average_doc_len: f32,
}

impl Bm25Index {
    /// Build an index from `(id, text)` rows. Rows that tokenize to nothing
    /// are dropped.
    pub fn build<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut docs = Vec::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut total_tokens = 0usize;

        for (id, text) in rows {
            let tokens = bm25_tokens(&text);
            if tokens.is_empty() {
                continue;
            }
            total_tokens += tokens.len();

            let mut term_frequency: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_frequency.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_frequency.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }

            docs.push(IndexedDoc {
                id,
                text,
                token_count: tokens.len() as f32,
                term_frequency,
            });
        }

        let average_doc_len = if docs.is_empty() {
            0.0
        } else {
            (total_tokens as f32) / (docs.len() as f32)
        };

        Self {
            docs,
            document_frequency,
            average_doc_len,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Inverse document frequency of a term.
    pub fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score_doc(&self, query_tokens: &[String], doc: &IndexedDoc) -> f32 {
        let mut score = 0.0;
        for term in query_tokens {
            let tf = doc.term_frequency.get(term).copied().unwrap_or(0) as f32;
            if tf == 0.0 {
                continue;
            }
            let norm = BM25_K1
                * (1.0 - BM25_B + BM25_B * doc.token_count / self.average_doc_len);
            score += self.idf(term) * (tf * (BM25_K1 + 1.0)) / (tf + norm);
        }
        score
    }

    /// Rank documents for a query, best first, at most `k` results.
    ///
    /// Zero-scoring documents are omitted; ties keep build order.
    pub fn search(&self, query: &str, k: usize) -> Vec<Bm25Match> {
        if self.docs.is_empty() || self.average_doc_len == 0.0 {
            return Vec::new();
        }
        let query_tokens = bm25_tokens(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<Bm25Match> = self
            .docs
            .iter()
            .filter_map(|doc| {
                let score = self.score_doc(&query_tokens, doc);
                (score > 0.0).then(|| Bm25Match {
                    id: doc.id.clone(),
                    text: doc.text.clone(),
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(k);
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn toy_index() -> Bm25Index {
        Bm25Index::build(vec![
            ("d1".to_string(), "diesel supply contract".to_string()),
            ("d2".to_string(), "diesel diesel pricing".to_string()),
            ("d3".to_string(), "solar panels warranty".to_string()),
        ])
    }

    #[test]
    fn one_term_query_matches_closed_form() {
        let index = toy_index();
        let hits = index.search("diesel", 10);
        assert_eq!(hits.len(), 2);

        // N = 3, df(diesel) = 2, every doc has 3 tokens so |d| / avgdl = 1.
        let idf = (1.0f32 + (3.0 - 2.0 + 0.5) / (2.0 + 0.5)).ln();
        let norm = BM25_K1 * (1.0 - BM25_B + BM25_B);
        let tf2 = 2.0f32;
        let expected_d2 = idf * (tf2 * (BM25_K1 + 1.0)) / (tf2 + norm);
        let expected_d1 = idf * (BM25_K1 + 1.0) / (1.0 + norm);

        assert_eq!(hits[0].id, "d2");
        assert!((hits[0].score - expected_d2).abs() < 1e-5);
        assert_eq!(hits[1].id, "d1");
        assert!((hits[1].score - expected_d1).abs() < 1e-5);
    }

    #[test]
    fn non_matching_docs_are_omitted() {
        let index = toy_index();
        let hits = index.search("diesel", 10);
        assert!(hits.iter().all(|h| h.id != "d3"));
    }

    #[test]
    fn empty_query_returns_nothing() {
        let index = toy_index();
        assert!(index.search("", 10).is_empty());
        assert!(index.search("a ! ,", 10).is_empty());
    }

    #[test]
    fn truncates_to_k() {
        let index = toy_index();
        let hits = index.search("diesel", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "d2");
    }

    #[test]
    fn empty_rows_are_skipped() {
        let index = Bm25Index::build(vec![
            ("d1".to_string(), "   ".to_string()),
            ("d2".to_string(), "diesel".to_string()),
        ]);
        assert_eq!(index.len(), 1);
    }
}
