//! Context classifier.
//!
//! Scores every configured context against every sentence, then aggregates,
//! ranks and normalizes. Per (sentence, context) the steps run in this order:
//!
//! ```text
//! cooldown check ─▶ base score ─▶ repeat decay ─▶ position/format boosts ─▶ boost cap ─▶ threshold
//!                    │
//!                    ├─ tone cues      hits × tone_cue_weight
//!                    ├─ weighted cues  hits × weight (generic tokens share one small cap)
//!                    └─ counter cues   × counter_cue_factor per matching cue
//! ```
//!
//! Boosts only apply to a context whose base score is positive, so a sentence
//! in capitals cannot conjure a context out of nothing. A candidate is retained
//! when its score is strictly above the threshold. Each sentence keeps at most
//! `max_contexts_per_sentence` candidates; only those feed their context's
//! bucket (re-weighted by the caller's attachment profile) and mark the context
//! as fired for cooldown and decay.
//!
//! After the last sentence, candidates are summed per context, ranked by
//! (priority desc, score desc, id asc), truncated, and given softmax
//! confidences. Priority decides which contexts survive truncation, but the
//! presented order is confidence desc (priority breaks ties). A low-priority
//! context with a larger score can therefore be primary over a high-priority
//! one; the primary context always has the highest confidence.
//!
//! With no candidates the result is a single `general` context at the
//! configured default confidence.

use super::guards::{self, GuardInput};
use crate::config::{Bucket, BucketScores, BucketWeights, ContextTuning, FeatureToggles};
use crate::detect::negation::NegationAnalysis;
use crate::detect::sarcasm::SarcasmAnalysis;
use crate::engine::compiled::{CompiledContext, TextView};
use crate::engine::trigger::FormatFeatures;
use crate::{SentenceSpan, Token};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub const GENERAL_CONTEXT: &str = "general";

/// Most exclamation marks a format cue counts per sentence.
const MAX_COUNTED_EXCLAMATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextScore {
    pub id: String,
    /// Raw accumulated score (pre-softmax).
    pub score: f64,
    /// Softmax confidence over the ranked contexts; `0` on per-sentence candidates.
    pub confidence: f64,
    pub matched_patterns: Vec<String>,
    /// First sentence the context fired in.
    pub sentence_index: usize,
    pub priority: i32,
    pub bucket: Option<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextClassification {
    pub primary: ContextScore,
    pub secondary: Option<ContextScore>,
    pub ranked: Vec<ContextScore>,
    /// Per-sentence candidates in sentence order.
    pub candidates: Vec<ContextScore>,
    /// Bucket scores after effects and guards.
    pub buckets: BucketScores,
    /// Dominant bucket, if any is positive.
    pub tone: Option<Bucket>,
    pub tripped_guards: Vec<String>,
}

impl ContextClassification {
    /// The fallback classification.
    pub(crate) fn general(tuning: &ContextTuning) -> Self {
        let general = general_context(tuning);
        ContextClassification {
            primary: general.clone(),
            secondary: None,
            ranked: vec![general],
            candidates: Vec::new(),
            buckets: BucketScores::default(),
            tone: None,
            tripped_guards: Vec::new(),
        }
    }
}

/// Advice category for a context id; unknown ids map to `"emotional"`.
pub fn category_for_context(id: &str) -> &'static str {
    match id {
        "conflict" => "conflict_resolution",
        "repair" => "repair",
        "boundary" => "boundary",
        "planning" => "practical",
        "co_parenting" => "relationship",
        "work/school" => "communication",
        "safety" => "emotional",
        "misunderstanding" => "clarity",
        GENERAL_CONTEXT => "general",
        _ => "emotional",
    }
}

/// Everything the classifier reads for one message.
pub(crate) struct ContextInput<'a> {
    pub text: &'a str,
    pub tokens: &'a [Token],
    pub sentences: &'a [SentenceSpan],
    pub contexts: &'a [CompiledContext],
    pub tuning: &'a ContextTuning,
    pub toggles: &'a FeatureToggles,
    pub negation: &'a NegationAnalysis,
    pub sarcasm: &'a SarcasmAnalysis,
    pub attachment: Option<&'a BucketWeights>,
}

pub(crate) fn classify(input: &ContextInput) -> ContextClassification {
    let tuning = input.tuning;
    let last_sentence = input.sentences.len().saturating_sub(1);

    let mut last_fired: HashMap<&str, usize> = HashMap::new();
    let mut matched_so_far: HashMap<&str, usize> = HashMap::new();
    let mut candidates: Vec<ContextScore> = Vec::new();
    let mut buckets = BucketScores::default();
    let mut clear_evidence = 0usize;
    let mut clear_sentences: Vec<&SentenceSpan> = Vec::new();

    for span in input.sentences {
        let view = TextView::sentence(input.text, input.tokens, span);
        let lower = view.slice().to_lowercase();
        let format = FormatFeatures::of(view.slice());
        let mut in_sentence: Vec<(&str, usize, ContextScore)> = Vec::new();

        for ctx in input.contexts {
            let id = ctx.id.as_str();
            if input.toggles.cooldowns {
                let cooldown = cooldown_sentences(ctx.cooldown_ms.unwrap_or(tuning.default_cooldown_ms), tuning);
                if let Some(&fired) = last_fired.get(id) {
                    if cooldown > 0 && span.index - fired < cooldown {
                        tracing::trace!(context = id, sentence = span.index, "cooling down");
                        continue;
                    }
                }
            }

            let (base, matched) = base_score(ctx, &view, &lower, tuning, input.toggles);
            if base <= 0.0 {
                continue;
            }
            let mut score = base;

            if last_fired.contains_key(id) {
                score *= tuning.repeat_decay;
            }

            if input.toggles.position_boosts {
                if span.index == 0 {
                    score += tuning.first_sentence_boost;
                }
                if span.index == last_sentence && last_sentence > 0 {
                    score += tuning.last_sentence_boost;
                }
                if format.caps_ratio >= tuning.caps_ratio_threshold {
                    score += tuning.caps_boost;
                }
            }
            if let Some(cues) = &ctx.format {
                score += cues.caps_weight * format.caps_ratio
                    + cues.exclamation_weight * format.exclamations.min(MAX_COUNTED_EXCLAMATIONS) as f64;
            }

            let seen = matched_so_far.get(id).copied().unwrap_or(0) + matched.len();
            if tuning.max_boosts_per_message > 0 && seen > tuning.max_boosts_per_message {
                score *= tuning.max_boosts_per_message as f64 / seen as f64;
            }

            if score <= tuning.score_threshold {
                continue;
            }

            in_sentence.push((
                id,
                seen,
                ContextScore {
                    id: ctx.id.clone(),
                    score,
                    confidence: 0.0,
                    matched_patterns: matched,
                    sentence_index: span.index,
                    priority: ctx.priority,
                    bucket: ctx.bucket,
                },
            ));
        }

        in_sentence.sort_by(|(_, _, a), (_, _, b)| rank_order(a, b));
        in_sentence.truncate(tuning.max_contexts_per_sentence);

        // Only candidates that survive truncation count as fired.
        for (id, seen, candidate) in in_sentence {
            matched_so_far.insert(id, seen);
            last_fired.insert(id, span.index);
            if let Some(bucket) = candidate.bucket {
                let weight = input.attachment.map_or(1.0, |w| w.get(bucket));
                *buckets.get_mut(bucket) += candidate.score * weight;
                if bucket == Bucket::Clear {
                    clear_evidence += candidate.matched_patterns.len();
                    clear_sentences.push(span);
                }
            }
            candidates.push(candidate);
        }
    }

    if input.negation.present {
        buckets.add(&tuning.negation_effects);
    }
    if input.sarcasm.has_sarcasm {
        buckets.add(&tuning.sarcasm_effects);
    }
    let local_negation = clear_sentences.iter().any(|span| input.negation.within(span));
    let guard_input = GuardInput { clear_evidence, local_negation, tuning };
    let (buckets, tripped) = guards::apply(buckets, &guard_input);

    let mut ranked = aggregate(&candidates);
    ranked.sort_by(rank_order);
    ranked.truncate(tuning.max_contexts.min(tuning.max_contexts_per_sentence));

    if ranked.is_empty() {
        return ContextClassification {
            candidates,
            buckets,
            tone: buckets.dominant(),
            tripped_guards: tripped.into_iter().map(String::from).collect(),
            ..ContextClassification::general(tuning)
        };
    }

    let confidences = softmax(&ranked.iter().map(|c| c.score).collect::<Vec<_>>());
    for (ctx, confidence) in ranked.iter_mut().zip(confidences) {
        ctx.confidence = confidence;
    }
    ranked.sort_by(|a, b| {
        b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal).then_with(|| rank_order(a, b))
    });

    ContextClassification {
        primary: ranked[0].clone(),
        secondary: ranked.get(1).cloned(),
        ranked,
        candidates,
        buckets,
        tone: buckets.dominant(),
        tripped_guards: tripped.into_iter().map(String::from).collect(),
    }
}

fn base_score(
    ctx: &CompiledContext,
    view: &TextView,
    lower: &str,
    tuning: &ContextTuning,
    toggles: &FeatureToggles,
) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut matched = Vec::new();

    for cue in &ctx.tone_cues {
        let hits = lower.matches(cue.as_str()).count();
        if hits > 0 {
            score += hits as f64 * tuning.tone_cue_weight;
            matched.push(cue.clone());
        }
    }

    if toggles.pattern_matching {
        let mut generic_total = 0.0;
        for cue in &ctx.weighted {
            let hits = cue.pattern.matcher.find_all(view).len();
            if hits == 0 {
                continue;
            }
            let mut contribution = hits as f64 * cue.weight;
            if cue.generic {
                contribution = contribution.min((tuning.generic_token_cap - generic_total).max(0.0));
                generic_total += contribution;
            }
            score += contribution;
            matched.push(cue.pattern.source.clone());
        }
        for counter in &ctx.counter {
            if counter.matcher.is_match(view) {
                score *= tuning.counter_cue_factor;
            }
        }
    }

    (score, matched)
}

/// Cooldown in sentences: `ceil(cooldown_ms / sentence_duration_ms)`.
fn cooldown_sentences(cooldown_ms: u64, tuning: &ContextTuning) -> usize {
    if cooldown_ms == 0 || tuning.sentence_duration_ms == 0 {
        return 0;
    }
    cooldown_ms.div_ceil(tuning.sentence_duration_ms) as usize
}

/// Sum per-context candidate scores; keep the first sentence and the union of
/// matched patterns. Output order is first appearance.
fn aggregate(candidates: &[ContextScore]) -> Vec<ContextScore> {
    let mut order: Vec<ContextScore> = Vec::new();
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for cand in candidates {
        match index.get(cand.id.as_str()) {
            Some(&i) => {
                let agg = &mut order[i];
                agg.score += cand.score;
                for p in &cand.matched_patterns {
                    if !agg.matched_patterns.contains(p) {
                        agg.matched_patterns.push(p.clone());
                    }
                }
            }
            None => {
                index.insert(cand.id.as_str(), order.len());
                order.push(cand.clone());
            }
        }
    }
    order
}

/// (priority desc, score desc, id asc)
fn rank_order(a: &ContextScore, b: &ContextScore) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| a.id.cmp(&b.id))
}

/// Max-shifted softmax.
pub(crate) fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn general_context(tuning: &ContextTuning) -> ContextScore {
    ContextScore {
        id: GENERAL_CONTEXT.to_string(),
        score: 0.0,
        confidence: tuning.default_confidence,
        matched_patterns: Vec::new(),
        sentence_index: 0,
        priority: 0,
        bucket: None,
    }
}
