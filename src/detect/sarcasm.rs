//! Sarcasm detector.
//!
//! Three pattern sources feed one list of signals: a fixed set of linguistic
//! patterns ("oh great", "yeah right"), configured patterns, and punctuation
//! patterns (interrobangs, ellipses, scare quotes). Punctuation patterns only
//! run when the trigger scan saw the relevant characters.
//!
//! The overall probability is affine in the hit count and the mean hit
//! confidence, clamped to `[0, 1]`; see [`SarcasmTuning`].

use crate::Range;
use crate::config::SarcasmTuning;
use crate::engine::compiled::{SarcasmMatcher, TextView};
use crate::engine::trigger::SignalMask;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SarcasmKind {
    Linguistic,
    Punctuation,
    Configured,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarcasmSignal {
    /// Matched text.
    pub pattern: String,
    pub start: usize,
    pub kind: SarcasmKind,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarcasmAnalysis {
    pub has_sarcasm: bool,
    pub sarcasm_score: f64,
    pub average_confidence: f64,
    pub signals: Vec<SarcasmSignal>,
}

fn linguistic() -> [(&'static Regex, f64); 8] {
    [
        (
            regex!(r"(?i)\boh,?\s+(?:great|wonderful|perfect|sure|really|joy|fantastic|nice|brilliant|lovely|good)\b"),
            0.8,
        ),
        (regex!(r"(?i)\bjust\s+(?:great|perfect|wonderful|fantastic|lovely|brilliant|what i needed)\b"), 0.7),
        (regex!(r"(?i)\byeah,?\s+right\b"), 0.85),
        (regex!(r"(?i)\bthanks\s+a\s+lot\b"), 0.5),
        (regex!(r"(?i)\bas\s+if\b"), 0.55),
        (regex!(r"(?i)\bwhat\s+a\s+(?:surprise|shock)\b"), 0.75),
        (regex!(r"(?i)\b(?:wow|gee),?\s+(?:thanks|great|really|amazing)\b"), 0.65),
        (regex!(r"(?i)\bsure,?\s+whatever\b"), 0.6),
    ]
}

fn punctuation() -> [(&'static Regex, f64, SignalMask); 4] {
    [
        (regex!(r"(?:\?!|!\?)[!?]*"), 0.4, SignalMask::HAS_QUESTION),
        (regex!(r"!{2,}"), 0.25, SignalMask::HAS_EXCLAMATION),
        (regex!(r"\.{3,}|…"), 0.25, SignalMask::HAS_ELLIPSIS),
        (regex!(r#""[^"\s]+(?:\s[^"\s]+)?""#), 0.4, SignalMask::HAS_QUOTES),
    ]
}

pub(crate) fn detect(
    view: &TextView,
    signals: SignalMask,
    configured: &[SarcasmMatcher],
    tuning: &SarcasmTuning,
) -> SarcasmAnalysis {
    let text = view.slice();
    let base = view.window.start;
    let mut hits: Vec<(Range, SarcasmKind, f64)> = Vec::new();

    for (re, confidence) in linguistic() {
        for m in re.find_iter(text) {
            hits.push((Range { start: base + m.start(), end: base + m.end() }, SarcasmKind::Linguistic, confidence));
        }
    }
    for matcher in configured {
        for range in matcher.pattern.matcher.find_all(view) {
            hits.push((range, SarcasmKind::Configured, matcher.confidence));
        }
    }
    if signals.intersects(SignalMask::PUNCTUATION_CUES) {
        for (re, confidence, needs) in punctuation() {
            if !signals.contains(needs) {
                continue;
            }
            for m in re.find_iter(text) {
                hits.push((Range { start: base + m.start(), end: base + m.end() }, SarcasmKind::Punctuation, confidence));
            }
        }
    }

    // Earlier sources win overlaps: linguistic, then configured, then punctuation.
    let mut accepted: Vec<(Range, SarcasmKind, f64)> = Vec::new();
    for hit in hits {
        if accepted.iter().all(|(r, _, _)| !r.overlaps(&hit.0)) {
            accepted.push(hit);
        }
    }
    accepted.sort_by_key(|(r, _, _)| r.start);

    let signals: Vec<SarcasmSignal> = accepted
        .into_iter()
        .map(|(range, kind, confidence)| SarcasmSignal {
            pattern: view.text[range.start..range.end].to_string(),
            start: range.start,
            kind,
            confidence,
        })
        .collect();

    score(signals, tuning)
}

fn score(signals: Vec<SarcasmSignal>, tuning: &SarcasmTuning) -> SarcasmAnalysis {
    if signals.is_empty() {
        return SarcasmAnalysis::default();
    }
    let count = signals.len() as f64;
    let average_confidence = signals.iter().map(|s| s.confidence).sum::<f64>() / count;
    let sarcasm_score =
        (tuning.intercept + tuning.count_weight * count + tuning.confidence_weight * average_confidence).clamp(0.0, 1.0);

    SarcasmAnalysis {
        has_sarcasm: sarcasm_score >= tuning.presence_threshold,
        sarcasm_score,
        average_confidence,
        signals,
    }
}
