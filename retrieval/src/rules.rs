//! Data-driven heuristic rule tables.
//!
//! Everything the re-scorer and expander treat as domain knowledge lives
//! here as data: keyword lists, intent vocabularies, noise patterns with
//! their penalties, and boost weights. The defaults encode the procurement
//! corpus the pipeline was tuned on; deployments load their own tables from
//! JSON instead of recompiling.

use serde::{Deserialize, Serialize};

use trawl_text::{bm25_tokens, significant_tokens};

use crate::error::Result;

/// Additive score adjustments applied after fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weights {
    /// Bonus for ids under the preferred domain prefix.
    pub domain: f32,

    /// Smaller bonus for same-protocol, different-domain ids.
    pub protocol: f32,

    /// Bonus for brand-term matches under brand intent.
    pub brand: f32,

    /// Penalty for email/proposal-like content under brand intent.
    pub email_penalty: f32,

    /// Bonus for intent-vocabulary matches (delivery, EV).
    pub intent: f32,

    /// Ceiling on the token-overlap bonus.
    pub overlap_cap: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            domain: 0.05,
            protocol: 0.02,
            brand: 0.06,
            email_penalty: 0.04,
            intent: 0.03,
            overlap_cap: 0.05,
        }
    }
}

/// A low-value content pattern and the penalty it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseRule {
    /// Substring matched against the lowercased id and text.
    pub pattern: String,

    /// Penalty subtracted from the working score.
    pub penalty: f32,
}

/// A topic word and the synonyms injected when it appears in a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymRule {
    /// Topic word that triggers the rule.
    pub topic: String,

    /// Terms appended as expansion variants.
    pub synonyms: Vec<String>,
}

/// The full rule set consumed by the expander and re-scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Bilingual domain keywords that arm the keyword prefilter.
    pub prefilter_keywords: Vec<String>,

    /// Per-source confidence scores for prefilter hits, primary first.
    pub source_confidences: Vec<f32>,

    /// Topic-keyed synonym injection for heuristic expansion.
    pub synonyms: Vec<SynonymRule>,

    /// Expansion phrases dropped before use (dictionary-style variants
    /// that derail brand-name queries).
    pub expansion_denylist: Vec<String>,

    /// Query phrasings that mark a brand/company-info intent.
    pub brand_intent_markers: Vec<String>,

    /// Query words that are not brand terms.
    pub brand_stopwords: Vec<String>,

    /// Curated expansion suffixes used instead of the generic heuristics
    /// under brand intent.
    pub brand_expansions: Vec<String>,

    /// Text markers for email/proposal-like content.
    pub email_markers: Vec<String>,

    /// Delivery-intent vocabulary.
    pub delivery_terms: Vec<String>,

    /// EV/charging-intent vocabulary.
    pub ev_terms: Vec<String>,

    /// Id substrings that identify EV content even without token overlap.
    pub ev_id_markers: Vec<String>,

    /// Known-low-value patterns with their penalties.
    pub noise: Vec<NoiseRule>,

    /// Boost weights.
    pub weights: Weights,
}

impl Default for RuleSet {
    fn default() -> Self {
        let s = |v: &[&str]| v.iter().map(|x| (*x).to_string()).collect::<Vec<_>>();
        Self {
            prefilter_keywords: s(&[
                "contract", "contracts", "supplier", "suppliers", "diesel", "fuel",
                "agreement", "terms", "pricing", "sow", "sla", "rfq", "tender", "bid",
                "procurement", "scope", "deliverables", "penalties", "liability",
                "payment", "incoterms", "delivery", "quantity", "quality",
                "specification",
                "عقد", "عقود", "مورد", "موردين", "توريد", "ديزل", "وقود", "اتفاقية",
                "شروط", "تسعير", "مناقصة", "عطاء", "دفع", "جودة", "كمية", "مواصفات",
                "تسليم",
            ]),
            source_confidences: vec![0.75, 0.70, 0.65],
            synonyms: vec![
                SynonymRule {
                    topic: "diesel".to_string(),
                    synonyms: s(&["fuel supply", "ديزل"]),
                },
                SynonymRule {
                    topic: "contract".to_string(),
                    synonyms: s(&["agreement terms", "عقد"]),
                },
                SynonymRule {
                    topic: "supplier".to_string(),
                    synonyms: s(&["vendor", "مورد"]),
                },
            ],
            expansion_denylist: s(&["define", "definition", "meaning of", "dictionary", "etymology"]),
            brand_intent_markers: s(&[
                "about us", "who is", "who are", "what does", "what do", "company overview",
                "tell me about", "من هي", "من هو", "ما هي شركة",
            ]),
            brand_stopwords: s(&[
                "what", "does", "who", "are", "about", "company", "tell", "the", "شركة",
            ]),
            brand_expansions: s(&[
                "about us",
                "company overview",
                "products and services",
                "what we do",
            ]),
            email_markers: s(&["dear ", "best regards", "kind regards", "proposal", "quotation for"]),
            delivery_terms: s(&["delivery", "deliver", "shipment", "dispatch", "توصيل", "تسليم"]),
            ev_terms: s(&["ev", "electric vehicle", "charging station", "charger", "شاحن", "كهربائية"]),
            ev_id_markers: s(&["ev-", "/ev/", "charg"]),
            noise: vec![
                NoiseRule { pattern: "market analysis".to_string(), penalty: 0.05 },
                NoiseRule { pattern: ".pptx".to_string(), penalty: 0.03 },
                NoiseRule { pattern: "certificate".to_string(), penalty: 0.04 },
                NoiseRule { pattern: "incident report".to_string(), penalty: 0.04 },
                NoiseRule { pattern: "audit report".to_string(), penalty: 0.04 },
                NoiseRule { pattern: "re:".to_string(), penalty: 0.03 },
                NoiseRule { pattern: "fwd:".to_string(), penalty: 0.03 },
            ],
            weights: Weights::default(),
        }
    }
}

impl RuleSet {
    /// Load a rule set from JSON.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Prefilter keywords present in the query, sorted for determinism.
    pub fn prefilter_matches(&self, query: &str) -> Vec<String> {
        let q = query.to_lowercase();
        let mut out: Vec<String> = self
            .prefilter_keywords
            .iter()
            .filter(|kw| q.contains(kw.as_str()))
            .cloned()
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Confidence for the `index`-th source; secondary sources past the
    /// table reuse the last entry.
    pub fn source_confidence(&self, index: usize) -> f32 {
        self.source_confidences
            .get(index)
            .or_else(|| self.source_confidences.last())
            .copied()
            .unwrap_or(0.5)
    }

    /// Whether the query reads as a brand/company-info question.
    pub fn is_brand_intent(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.brand_intent_markers.iter().any(|m| q.contains(m.as_str()))
    }

    /// Brand terms of a brand-intent query: its significant tokens minus
    /// the question scaffolding.
    pub fn brand_terms(&self, query: &str) -> Vec<String> {
        significant_tokens(query, 6)
            .into_iter()
            .filter(|t| !self.brand_stopwords.contains(t))
            .collect()
    }

    /// Whether the query carries delivery intent.
    pub fn has_delivery_intent(&self, query: &str) -> bool {
        contains_any_term(query, &self.delivery_terms)
    }

    /// Whether the query carries EV/charging intent.
    pub fn has_ev_intent(&self, query: &str) -> bool {
        contains_any_term(query, &self.ev_terms)
    }

    /// Whether an id marks EV content.
    pub fn is_ev_id(&self, id: &str) -> bool {
        let id = id.to_lowercase();
        self.ev_id_markers.iter().any(|m| id.contains(m.as_str()))
    }

    /// Total noise penalty for a candidate's id and text.
    pub fn noise_penalty(&self, id: &str, text: &str) -> f32 {
        let id = id.to_lowercase();
        let text = text.to_lowercase();
        self.noise
            .iter()
            .filter(|rule| id.contains(&rule.pattern) || text.contains(&rule.pattern))
            .map(|rule| rule.penalty)
            .sum()
    }

    /// Whether any email/proposal marker appears in the text.
    pub fn looks_like_email(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.email_markers.iter().any(|m| text.contains(m.as_str()))
    }

    /// Whether an expansion phrase is denylisted.
    pub fn is_denylisted_expansion(&self, phrase: &str) -> bool {
        let p = phrase.to_lowercase();
        self.expansion_denylist.iter().any(|d| p.contains(d.as_str()))
    }
}

/// Match single-word terms token-wise (so "ev" never matches "delivery")
/// and multi-word phrases by substring.
fn contains_any_term(query: &str, terms: &[String]) -> bool {
    let q = query.to_lowercase();
    let tokens = bm25_tokens(&q);
    terms.iter().any(|term| {
        if term.contains(' ') {
            q.contains(term.as_str())
        } else {
            tokens.iter().any(|t| t == term)
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn prefilter_matches_both_scripts() {
        let rules = RuleSet::default();
        let hits = rules.prefilter_matches("Diesel supply عقود pricing");
        assert!(hits.contains(&"diesel".to_string()));
        assert!(hits.contains(&"pricing".to_string()));
        assert!(hits.contains(&"عقود".to_string()));
    }

    #[test]
    fn source_confidence_steps_down_then_holds() {
        let rules = RuleSet::default();
        assert_eq!(rules.source_confidence(0), 0.75);
        assert_eq!(rules.source_confidence(1), 0.70);
        assert_eq!(rules.source_confidence(2), 0.65);
        assert_eq!(rules.source_confidence(9), 0.65);
    }

    #[test]
    fn brand_intent_and_terms() {
        let rules = RuleSet::default();
        assert!(rules.is_brand_intent("what does example corp do"));
        assert!(!rules.is_brand_intent("diesel delivery schedule"));
        assert_eq!(
            rules.brand_terms("what does example corp do"),
            vec!["example", "corp"]
        );
    }

    #[test]
    fn ev_intent_is_token_wise() {
        let rules = RuleSet::default();
        assert!(rules.has_ev_intent("nearest ev charger"));
        // "delivery" contains "ev" as a substring but is not EV intent.
        assert!(!rules.has_ev_intent("diesel delivery schedule"));
        assert!(rules.has_delivery_intent("diesel delivery schedule"));
    }

    #[test]
    fn noise_penalties_accumulate() {
        let rules = RuleSet::default();
        let penalty = rules.noise_penalty("file://deck.pptx", "market analysis slides");
        assert!((penalty - 0.08).abs() < 1e-6);
        assert_eq!(rules.noise_penalty("web://x/about", "plain prose"), 0.0);
    }

    #[test]
    fn denylist_blocks_dictionary_expansions() {
        let rules = RuleSet::default();
        assert!(rules.is_denylisted_expansion("definition of gasable"));
        assert!(!rules.is_denylisted_expansion("gasable services"));
    }

    #[test]
    fn round_trips_through_json() {
        let rules = RuleSet::default();
        let json = serde_json::to_string(&rules).unwrap();
        let loaded = RuleSet::from_json_str(&json).unwrap();
        assert_eq!(loaded.prefilter_keywords, rules.prefilter_keywords);
        assert_eq!(loaded.noise.len(), rules.noise.len());
    }
}
