//! Phrase-edge matcher: configured phrases that mark a conversational "edge"
//! (escalation, repair, rupture, ...).

use crate::engine::compiled::{CompiledEdge, TextView};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseEdgeHit {
    pub edge: String,
    pub category: String,
    pub matched: String,
    pub start: usize,
    pub end: usize,
    pub weight: f64,
}

/// Every hit of every edge, stably ordered by start offset.
pub(crate) fn detect(view: &TextView, edges: &[CompiledEdge]) -> Vec<PhraseEdgeHit> {
    let mut hits = Vec::new();
    for edge in edges {
        for pattern in &edge.patterns {
            for range in pattern.matcher.find_all(view) {
                hits.push(PhraseEdgeHit {
                    edge: edge.id.clone(),
                    category: edge.category.clone(),
                    matched: view.text[range.start..range.end].to_string(),
                    start: range.start,
                    end: range.end,
                    weight: edge.weight,
                });
            }
        }
    }
    hits.sort_by_key(|h| h.start);
    hits
}
