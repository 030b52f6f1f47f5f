//! Taxonomy (P-code) classifier.
//!
//! Rule score per code: `rule_increment` for every seed pattern that matches at
//! least once. ML score per code: the zero-shot provider's confidence for the
//! code's label, mapped back through normalized label keys. Merge is a
//! code-wise sum; codes below the threshold are dropped and the rest ranked by
//! merged score (code breaks ties).

use super::zero_shot::ZeroShotResponse;
use crate::engine::compiled::{CompiledCode, TextView, label_key};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyScore {
    pub code: String,
    pub label: String,
    /// Merged score, always at or above the threshold.
    pub score: f64,
    pub rule_score: f64,
    pub ml_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyResult {
    /// Retained codes, best first.
    pub scores: Vec<TaxonomyScore>,
    pub rule_scores: BTreeMap<String, f64>,
    pub ml_scores: BTreeMap<String, f64>,
    pub ml_applied: bool,
    pub model: Option<String>,
}

impl TaxonomyResult {
    pub fn top_codes(&self, n: usize) -> Vec<&str> {
        self.scores.iter().take(n).map(|s| s.code.as_str()).collect()
    }
}

/// Rule scores for every code with at least one matching seed.
pub(crate) fn rule_scores(view: &TextView, codes: &[CompiledCode], increment: f64) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for code in codes {
        let hits = code.seeds.iter().filter(|seed| seed.matcher.is_match(view)).count();
        if hits > 0 {
            out.insert(code.code.clone(), hits as f64 * increment);
        }
    }
    out
}

/// Map provider predictions onto codes. Unknown labels are ignored; when a
/// label repeats, the highest confidence wins.
pub(crate) fn ml_scores(response: &ZeroShotResponse, codes: &[CompiledCode]) -> BTreeMap<String, f64> {
    let by_key: BTreeMap<&str, &str> = codes.iter().map(|c| (c.label_key.as_str(), c.code.as_str())).collect();
    let mut out: BTreeMap<String, f64> = BTreeMap::new();
    for prediction in &response.predictions {
        let key = label_key(&prediction.label);
        let Some(&code) = by_key.get(key.as_str()) else {
            tracing::debug!(label = %prediction.label, "zero-shot label has no taxonomy code");
            continue;
        };
        if !prediction.confidence.is_finite() {
            continue;
        }
        let confidence = prediction.confidence.clamp(0.0, 1.0);
        let slot = out.entry(code.to_string()).or_insert(confidence);
        *slot = slot.max(confidence);
    }
    out
}

pub(crate) fn merge(
    codes: &[CompiledCode],
    rule_scores: BTreeMap<String, f64>,
    ml: Option<(BTreeMap<String, f64>, String)>,
    threshold: f64,
) -> TaxonomyResult {
    let (ml_scores, model) = match ml {
        Some((scores, model)) => (scores, Some(model)),
        None => (BTreeMap::new(), None),
    };

    let mut scores: Vec<TaxonomyScore> = codes
        .iter()
        .filter_map(|code| {
            let rule_score = rule_scores.get(&code.code).copied().unwrap_or(0.0);
            let ml_score = ml_scores.get(&code.code).copied();
            let score = rule_score + ml_score.unwrap_or(0.0);
            (score >= threshold).then(|| TaxonomyScore {
                code: code.code.clone(),
                label: code.label.clone(),
                score,
                rule_score,
                ml_score,
            })
        })
        .collect();
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a.code.cmp(&b.code)));

    TaxonomyResult { scores, rule_scores, ml_applied: model.is_some(), ml_scores, model }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::zero_shot::LabelPrediction;
    use crate::config::{ContextTuning, RuleSet};
    use crate::engine::compiled::CompiledPatterns;
    use crate::text::tokenize;

    fn codes() -> Vec<CompiledCode> {
        CompiledPatterns::compile(&RuleSet::builtin(), &ContextTuning::default()).codes
    }

    fn rules_for(text: &str) -> BTreeMap<String, f64> {
        let tokens = tokenize(text);
        rule_scores(&TextView::whole(text, &tokens), &codes(), 0.3)
    }

    #[test]
    fn one_increment_per_matching_seed() {
        let scores = rules_for("You always blame me, you always do");
        assert!((scores["P002"] - 0.6).abs() < 1e-12);
        assert!(!scores.contains_key("P001"));
    }

    #[test]
    fn threshold_filters_and_ranks() {
        let mut rule = BTreeMap::new();
        rule.insert("P002".to_string(), 0.6);
        rule.insert("P005".to_string(), 0.3);
        rule.insert("P001".to_string(), 0.6);
        let res = merge(&codes(), rule, None, 0.45);
        assert_eq!(res.top_codes(5), vec!["P001", "P002"]);
        assert!(res.scores.iter().all(|s| s.score >= 0.45));
        assert!(!res.ml_applied);
    }

    #[test]
    fn ml_scores_map_by_normalized_label() {
        let response = ZeroShotResponse {
            predictions: vec![
                LabelPrediction { label: "Stonewalling / Withdrawal".into(), confidence: 0.4 },
                LabelPrediction { label: "stonewalling-withdrawal".into(), confidence: 0.2 },
                LabelPrediction { label: "unknown label".into(), confidence: 0.9 },
            ],
            model: "fake-nli".into(),
        };
        let ml = ml_scores(&response, &codes());
        assert_eq!(ml.len(), 1);
        assert!((ml["P005"] - 0.4).abs() < 1e-12);

        let mut rule = BTreeMap::new();
        rule.insert("P005".to_string(), 0.3);
        let res = merge(&codes(), rule, Some((ml, response.model.clone())), 0.45);
        assert_eq!(res.top_codes(1), vec!["P005"]);
        assert!((res.scores[0].score - 0.7).abs() < 1e-12);
        assert_eq!(res.scores[0].ml_score, Some(0.4));
        assert_eq!(res.model.as_deref(), Some("fake-nli"));
    }
}
