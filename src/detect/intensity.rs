//! Intensity detector.
//!
//! Built-in intensity adverbs come in four levels; configured modifiers carry
//! their own multiplier and (optionally) a level. The overall intensity is a
//! product with diminishing returns: the `i`-th hit (0-based, in text order)
//! contributes a factor of `1 + clamp(m - 1, ±MAX_STEP) / (i + 1)`, so piling up
//! "very very very" cannot run away. The product is clamped to
//! `[FLOOR, CEILING]`.

use crate::Range;
use crate::engine::compiled::{IntensityMatcher, TextView};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_STEP: f64 = 0.5;
const FLOOR: f64 = 0.25;
const CEILING: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntensityLevel {
    Low,
    Moderate,
    ModerateHigh,
    High,
    /// Configured modifier without an explicit level.
    Custom,
}

impl IntensityLevel {
    pub fn multiplier(self) -> f64 {
        match self {
            IntensityLevel::Low => 0.85,
            IntensityLevel::Moderate => 1.15,
            IntensityLevel::ModerateHigh => 1.3,
            IntensityLevel::High => 1.5,
            IntensityLevel::Custom => 1.0,
        }
    }

    /// Tie-break rank for the dominant level; `Custom` ranks lowest.
    fn rank(self) -> u8 {
        match self {
            IntensityLevel::Custom => 0,
            IntensityLevel::Low => 1,
            IntensityLevel::Moderate => 2,
            IntensityLevel::ModerateHigh => 3,
            IntensityLevel::High => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntensityMarker {
    pub pattern: String,
    pub start: usize,
    pub level: IntensityLevel,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntensityAnalysis {
    pub overall_intensity: f64,
    pub dominant_level: Option<IntensityLevel>,
    pub markers: Vec<IntensityMarker>,
}

impl Default for IntensityAnalysis {
    fn default() -> Self {
        Self { overall_intensity: 1.0, dominant_level: None, markers: Vec::new() }
    }
}

fn adverbs() -> [(&'static Regex, IntensityLevel); 4] {
    [
        (
            regex!(r"(?i)\b(?:slightly|somewhat|a bit|a little|kinda|kind of|sort of|mildly)\b"),
            IntensityLevel::Low,
        ),
        (regex!(r"(?i)\b(?:very|really|pretty|quite|so|too)\b"), IntensityLevel::Moderate),
        (
            regex!(r"(?i)\b(?:extremely|incredibly|super|seriously|totally|truly|deeply|terribly)\b"),
            IntensityLevel::ModerateHigh,
        ),
        (
            regex!(r"(?i)\b(?:absolutely|completely|utterly|insanely|ridiculously|beyond)\b"),
            IntensityLevel::High,
        ),
    ]
}

pub(crate) fn detect(view: &TextView, configured: &[IntensityMatcher]) -> IntensityAnalysis {
    let base = view.window.start;
    let mut hits: Vec<(Range, IntensityLevel, f64)> = Vec::new();

    for (re, level) in adverbs() {
        for m in re.find_iter(view.slice()) {
            hits.push((Range { start: base + m.start(), end: base + m.end() }, level, level.multiplier()));
        }
    }
    for matcher in configured {
        for range in matcher.pattern.matcher.find_all(view) {
            hits.push((range, matcher.level, matcher.multiplier));
        }
    }

    let mut accepted: Vec<(Range, IntensityLevel, f64)> = Vec::new();
    for hit in hits {
        if accepted.iter().all(|(r, _, _)| !r.overlaps(&hit.0)) {
            accepted.push(hit);
        }
    }
    accepted.sort_by_key(|(r, _, _)| r.start);

    let markers: Vec<IntensityMarker> = accepted
        .into_iter()
        .map(|(range, level, multiplier)| IntensityMarker {
            pattern: view.text[range.start..range.end].to_string(),
            start: range.start,
            level,
            multiplier,
        })
        .collect();

    IntensityAnalysis {
        overall_intensity: combine(markers.iter().map(|m| m.multiplier)),
        dominant_level: dominant(&markers),
        markers,
    }
}

fn combine(multipliers: impl Iterator<Item = f64>) -> f64 {
    multipliers
        .enumerate()
        .fold(1.0, |acc, (i, m)| acc * (1.0 + (m - 1.0).clamp(-MAX_STEP, MAX_STEP) / (i + 1) as f64))
        .clamp(FLOOR, CEILING)
}

/// Most frequent level; ties go to the stronger level.
fn dominant(markers: &[IntensityMarker]) -> Option<IntensityLevel> {
    let mut counts: BTreeMap<IntensityLevel, usize> = BTreeMap::new();
    for m in markers {
        *counts.entry(m.level).or_default() += 1;
    }
    counts.into_iter().max_by_key(|&(level, count)| (count, level.rank())).map(|(level, _)| level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContextTuning, RuleSet};
    use crate::engine::compiled::CompiledPatterns;
    use crate::text::tokenize;

    fn run(text: &str, rules: &RuleSet) -> IntensityAnalysis {
        let compiled = CompiledPatterns::compile(rules, &ContextTuning::default());
        let tokens = tokenize(text);
        detect(&TextView::whole(text, &tokens), &compiled.intensity)
    }

    #[test]
    fn no_markers_means_neutral() {
        let res = run("See you at dinner", &RuleSet::default());
        assert_eq!(res, IntensityAnalysis::default());
        assert_eq!(res.overall_intensity, 1.0);
    }

    #[test]
    fn repeated_hits_have_diminishing_returns() {
        let one = run("I am very tired", &RuleSet::default()).overall_intensity;
        let three = run("I am very very very tired", &RuleSet::default()).overall_intensity;
        assert!((one - 1.15).abs() < 1e-9);
        // 1.15 * 1.075 * 1.05
        assert!((three - 1.15 * 1.075 * 1.05).abs() < 1e-9);
        assert!(three < 1.15f64.powi(3));
    }

    #[test]
    fn dominant_level_breaks_ties_upward() {
        let res = run("slightly absolutely", &RuleSet::default());
        assert_eq!(res.dominant_level, Some(IntensityLevel::High));
        let res = run("kinda sort of absolutely", &RuleSet::default());
        assert_eq!(res.dominant_level, Some(IntensityLevel::Low));
    }

    #[test]
    fn configured_modifiers_default_to_custom() {
        let res = run("Stop!!!", &RuleSet::builtin());
        assert_eq!(res.markers.len(), 1);
        assert_eq!(res.markers[0].level, IntensityLevel::Custom);
        assert!((res.overall_intensity - 1.3).abs() < 1e-9);
    }

    #[test]
    fn overall_is_bounded() {
        let huge = combine(std::iter::repeat_n(10.0, 200));
        assert!(huge <= CEILING);
        let tiny = combine(std::iter::repeat_n(0.0, 200));
        assert!(tiny >= FLOOR);
    }
}
