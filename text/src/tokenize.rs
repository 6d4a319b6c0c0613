//! Tokenizers shared by the lexical strategies.
//!
//! Three views of the same text, each tuned to its consumer: BM25 scoring,
//! substring pattern search, and token-set similarity for MMR.

use std::collections::HashSet;

/// Hard cap on tokens taken from one document for BM25.
const BM25_DOC_TOKEN_CAP: usize = 4000;

/// Hard cap on entries in a similarity token set.
const SIMILARITY_TOKEN_CAP: usize = 2000;

/// Tokenize for BM25: lowercase, split on non-alphanumeric (Latin and
/// Arabic both count), drop single-character tokens, cap per document.
pub fn bm25_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .take(BM25_DOC_TOKEN_CAP)
        .map(str::to_string)
        .collect()
}

/// Significant tokens for pattern search: longer than two characters,
/// deduplicated in first-seen order, capped at `max`.
pub fn significant_tokens(text: &str, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
    {
        if seen.insert(token.to_string()) {
            out.push(token.to_string());
            if out.len() >= max {
                break;
            }
        }
    }
    out
}

fn starts_token(c: char) -> bool {
    c.is_ascii_alphabetic() || ('\u{0600}'..='\u{06ff}').contains(&c)
}

fn continues_token(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || ('\u{0600}'..='\u{06ff}').contains(&c)
}

/// Token set for Jaccard similarity: letter-initial runs of word characters,
/// at least three characters long, lowercased, capped.
pub fn similarity_token_set(text: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut current = String::new();
    for c in text.chars() {
        if current.is_empty() {
            if starts_token(c) {
                current.push(c);
            }
        } else if continues_token(c) {
            current.push(c);
        } else {
            if current.chars().count() >= 3 {
                out.insert(current.to_lowercase());
            }
            current.clear();
            if starts_token(c) {
                current.push(c);
            }
        }
        if out.len() >= SIMILARITY_TOKEN_CAP {
            return out;
        }
    }
    if current.chars().count() >= 3 {
        out.insert(current.to_lowercase());
    }
    out
}

/// Jaccard overlap between two token sets. Empty sets score zero.
pub fn token_jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.union(b).count();
    (inter as f32) / (union.max(1) as f32)
}
