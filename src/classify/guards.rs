//! Bucket guards.
//!
//! An ordered pipeline of named guard functions. Each guard takes the bucket
//! scores and returns (possibly) adjusted scores; the pipeline reports which
//! guards changed something so the rich result can show it.
//!
//! ```text
//! scores ─▶ clear_min_evidence ─▶ clear_local_negation ─▶ alert_overshadow ─▶ clamp_non_negative ─▶ scores'
//! ```

use crate::config::{BucketScores, ContextTuning};

/// Facts the guards look at besides the scores themselves.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GuardInput<'a> {
    /// Matched patterns that fed the clear bucket.
    pub clear_evidence: usize,
    /// A negation sits in a sentence where a clear-bucket context fired.
    pub local_negation: bool,
    pub tuning: &'a ContextTuning,
}

pub(crate) type Guard = fn(BucketScores, &GuardInput<'_>) -> BucketScores;

pub(crate) const PIPELINE: &[(&str, Guard)] = &[
    ("clear_min_evidence", clear_min_evidence as Guard),
    ("clear_local_negation", clear_local_negation as Guard),
    ("alert_overshadow", alert_overshadow as Guard),
    ("clamp_non_negative", clamp_non_negative as Guard),
];

/// Run every guard in order. Returns the final scores and the names of the
/// guards that changed them.
pub(crate) fn apply(mut scores: BucketScores, input: &GuardInput) -> (BucketScores, Vec<&'static str>) {
    let mut tripped = Vec::new();
    for &(name, guard) in PIPELINE {
        let next = guard(scores, input);
        if next != scores {
            tracing::debug!(guard = name, ?scores, ?next, "bucket guard tripped");
            tripped.push(name);
        }
        scores = next;
    }
    (scores, tripped)
}

fn clear_min_evidence(mut scores: BucketScores, input: &GuardInput) -> BucketScores {
    if scores.clear > 0.0 && input.clear_evidence < input.tuning.clear_min_evidence {
        scores.clear *= input.tuning.clear_dampen;
    }
    scores
}

fn clear_local_negation(mut scores: BucketScores, input: &GuardInput) -> BucketScores {
    if scores.clear > 0.0 && input.local_negation {
        scores.clear *= input.tuning.clear_dampen;
    }
    scores
}

fn alert_overshadow(mut scores: BucketScores, input: &GuardInput) -> BucketScores {
    let t = input.tuning;
    if scores.clear > 0.0 && scores.alert >= t.alert_strong && scores.clear < scores.alert * t.overshadow_ratio {
        scores.clear *= t.clear_dampen;
    }
    scores
}

fn clamp_non_negative(scores: BucketScores, _: &GuardInput) -> BucketScores {
    BucketScores { clear: scores.clear.max(0.0), caution: scores.caution.max(0.0), alert: scores.alert.max(0.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(tuning: &ContextTuning, clear_evidence: usize, local_negation: bool) -> GuardInput<'_> {
        GuardInput { clear_evidence, local_negation, tuning }
    }

    #[test]
    fn thin_clear_evidence_is_dampened() {
        let tuning = ContextTuning::default();
        let out = clear_min_evidence(BucketScores { clear: 1.0, ..Default::default() }, &input(&tuning, 1, false));
        assert!((out.clear - 0.4).abs() < 1e-12);
        let out = clear_min_evidence(BucketScores { clear: 1.0, ..Default::default() }, &input(&tuning, 2, false));
        assert_eq!(out.clear, 1.0);
    }

    #[test]
    fn local_negation_dampens_clear() {
        let tuning = ContextTuning::default();
        let out = clear_local_negation(BucketScores { clear: 0.5, ..Default::default() }, &input(&tuning, 5, true));
        assert!((out.clear - 0.2).abs() < 1e-12);
    }

    #[test]
    fn strong_alert_overshadows_clear_unless_outweighed() {
        let tuning = ContextTuning::default();
        let guard_in = input(&tuning, 5, false);
        let out = alert_overshadow(BucketScores { clear: 1.0, caution: 0.0, alert: 0.8 }, &guard_in);
        assert!((out.clear - 0.4).abs() < 1e-12);
        // 1.3 >= 0.8 * 1.5
        let out = alert_overshadow(BucketScores { clear: 1.3, caution: 0.0, alert: 0.8 }, &guard_in);
        assert_eq!(out.clear, 1.3);
        // Weak alert never overshadows.
        let out = alert_overshadow(BucketScores { clear: 0.1, caution: 0.0, alert: 0.5 }, &guard_in);
        assert_eq!(out.clear, 0.1);
    }

    #[test]
    fn pipeline_reports_tripped_guards_in_order() {
        let tuning = ContextTuning::default();
        let scores = BucketScores { clear: 0.3, caution: -0.1, alert: 0.9 };
        let (out, tripped) = apply(scores, &input(&tuning, 0, true));
        assert_eq!(tripped, vec!["clear_min_evidence", "clear_local_negation", "alert_overshadow", "clamp_non_negative"]);
        assert_eq!(out.caution, 0.0);
        assert!((out.clear - 0.3 * 0.4 * 0.4 * 0.4).abs() < 1e-12);
    }
}
