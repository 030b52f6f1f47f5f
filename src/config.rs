//! Injected configuration.
//!
//! Two documents drive the engine:
//!
//! - [`EngineConfig`]: the tuning surface (budgets, cache capacity, thresholds,
//!   feature toggles, scoring constants).
//! - [`RuleSet`]: the rule data (context definitions, indicator sets, phrase
//!   edges, taxonomy codes, attachment profiles).
//!
//! Both are plain serde structs with every field defaulted, so a partial or
//! empty document still yields a usable (if quiet) engine. Reading files is the
//! caller's business; these types only interpret already-loaded data.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- Tuning surface ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub budget: BudgetConfig,
    /// Entries per cache map.
    pub cache_capacity: usize,
    pub taxonomy: TaxonomyTuning,
    pub zero_shot: ZeroShotConfig,
    pub toggles: FeatureToggles,
    pub context: ContextTuning,
    pub sarcasm: SarcasmTuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            cache_capacity: 128,
            taxonomy: TaxonomyTuning::default(),
            zero_shot: ZeroShotConfig::default(),
            toggles: FeatureToggles::default(),
            context: ContextTuning::default(),
            sarcasm: SarcasmTuning::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(doc: &str) -> Result<Self> {
        Ok(serde_json::from_str(doc)?)
    }
}

/// Per-call ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Hard clamp on input length (in characters), applied before anything else.
    pub max_chars: usize,
    /// Token count above which the expensive detectors are skipped.
    pub max_tokens: usize,
    /// Advisory wall-clock budget; overruns are logged, never aborted.
    pub max_millis: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { max_chars: 2000, max_tokens: 400, max_millis: 50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyTuning {
    /// Merged scores below this value are dropped.
    pub threshold: f64,
    /// Rule score added per matching seed pattern.
    pub rule_increment: f64,
}

impl Default for TaxonomyTuning {
    fn default() -> Self {
        Self { threshold: 0.45, rule_increment: 0.3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroShotConfig {
    pub enabled: bool,
    /// Hard timeout for a single provider call.
    pub timeout_ms: u64,
}

impl Default for ZeroShotConfig {
    fn default() -> Self {
        Self { enabled: false, timeout_ms: 1500 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Weighted-cue and counter-cue matching in the context classifier.
    pub pattern_matching: bool,
    pub position_boosts: bool,
    pub cooldowns: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self { pattern_matching: true, position_boosts: true, cooldowns: true }
    }
}

/// Scoring constants for the context classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextTuning {
    /// A context must reach this raw score in a sentence to be retained.
    pub score_threshold: f64,
    pub tone_cue_weight: f64,
    /// Ceiling on the total contribution of generic tokens per sentence.
    pub generic_token_cap: f64,
    pub generic_tokens: Vec<String>,
    /// Multiplier applied once per counter-cue hit.
    pub counter_cue_factor: f64,
    /// Multiplier applied when the context already fired in an earlier sentence.
    pub repeat_decay: f64,
    pub first_sentence_boost: f64,
    pub last_sentence_boost: f64,
    pub caps_ratio_threshold: f64,
    pub caps_boost: f64,
    pub max_boosts_per_message: usize,
    pub max_contexts: usize,
    pub max_contexts_per_sentence: usize,
    pub default_cooldown_ms: u64,
    /// Assumed reading time of one sentence; converts cooldowns to sentence distance.
    pub sentence_duration_ms: u64,
    /// Additive bucket effect when any negation is present.
    pub negation_effects: BucketScores,
    /// Additive bucket effect when sarcasm is present.
    pub sarcasm_effects: BucketScores,
    pub clear_min_evidence: usize,
    /// Multiplier applied to the clear bucket by each guard that trips.
    pub clear_dampen: f64,
    pub alert_strong: f64,
    /// Clear must exceed alert by this ratio to survive a strong alert.
    pub overshadow_ratio: f64,
    /// Confidence of the fallback "general" context.
    pub default_confidence: f64,
}

impl Default for ContextTuning {
    fn default() -> Self {
        Self {
            score_threshold: 0.25,
            tone_cue_weight: 0.3,
            generic_token_cap: 0.15,
            generic_tokens: [
                "i", "you", "me", "we", "us", "it", "they", "he", "she", "this", "that", "the", "a", "an", "just",
                "like", "really", "so", "um", "uh", "ok", "okay", "well",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            counter_cue_factor: 0.7,
            repeat_decay: 0.75,
            first_sentence_boost: 0.1,
            last_sentence_boost: 0.05,
            caps_ratio_threshold: 0.6,
            caps_boost: 0.15,
            max_boosts_per_message: 8,
            max_contexts: 3,
            max_contexts_per_sentence: 3,
            default_cooldown_ms: 0,
            sentence_duration_ms: 1500,
            negation_effects: BucketScores { clear: -0.15, caution: 0.1, alert: 0.0 },
            sarcasm_effects: BucketScores { clear: -0.2, caution: 0.15, alert: 0.05 },
            clear_min_evidence: 2,
            clear_dampen: 0.4,
            alert_strong: 0.6,
            overshadow_ratio: 1.5,
            default_confidence: 0.1,
        }
    }
}

/// Affine sarcasm probability: `intercept + count_weight * hits + confidence_weight * mean`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarcasmTuning {
    pub intercept: f64,
    pub count_weight: f64,
    pub confidence_weight: f64,
    pub presence_threshold: f64,
}

impl Default for SarcasmTuning {
    fn default() -> Self {
        Self { intercept: 0.0, count_weight: 0.15, confidence_weight: 0.6, presence_threshold: 0.35 }
    }
}

// --- Buckets and attachment profiles ----------------------------------------

/// Coarse severity dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Clear,
    Caution,
    Alert,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Clear, Bucket::Caution, Bucket::Alert];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Clear => "clear",
            Bucket::Caution => "caution",
            Bucket::Alert => "alert",
        }
    }
}

/// One number per bucket. Used both for accumulated scores and for additive
/// effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketScores {
    pub clear: f64,
    pub caution: f64,
    pub alert: f64,
}

impl BucketScores {
    pub fn get(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Clear => self.clear,
            Bucket::Caution => self.caution,
            Bucket::Alert => self.alert,
        }
    }

    pub fn get_mut(&mut self, bucket: Bucket) -> &mut f64 {
        match bucket {
            Bucket::Clear => &mut self.clear,
            Bucket::Caution => &mut self.caution,
            Bucket::Alert => &mut self.alert,
        }
    }

    pub fn add(&mut self, other: &BucketScores) {
        for bucket in Bucket::ALL {
            *self.get_mut(bucket) += other.get(bucket);
        }
    }

    /// Highest bucket; ties resolve toward the more severe bucket. `None` when
    /// every bucket is zero or below.
    pub fn dominant(&self) -> Option<Bucket> {
        let mut best: Option<(Bucket, f64)> = None;
        for bucket in Bucket::ALL {
            let value = self.get(bucket);
            if value <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, b)| value >= b) {
                best = Some((bucket, value));
            }
        }
        best.map(|(b, _)| b)
    }
}

/// Caller-supplied attachment style used to re-weight bucket contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStyle {
    Secure,
    Anxious,
    Avoidant,
    Disorganized,
}

impl AttachmentStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentStyle::Secure => "secure",
            AttachmentStyle::Anxious => "anxious",
            AttachmentStyle::Avoidant => "avoidant",
            AttachmentStyle::Disorganized => "disorganized",
        }
    }
}

/// Multiplicative per-bucket weights (missing fields default to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketWeights {
    pub clear: f64,
    pub caution: f64,
    pub alert: f64,
}

impl Default for BucketWeights {
    fn default() -> Self {
        Self { clear: 1.0, caution: 1.0, alert: 1.0 }
    }
}

impl BucketWeights {
    pub fn get(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Clear => self.clear,
            Bucket::Caution => self.caution,
            Bucket::Alert => self.alert,
        }
    }
}

// --- Patterns ---------------------------------------------------------------

/// How a configured pattern is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    /// Case-insensitive substring.
    Substring,
    /// Case-insensitive whole word(s), bounded by `\b`.
    Word,
    /// User regex, compiled as written.
    Regex,
    /// Token sequence compared against lowercased token texts.
    Ngram,
}

/// A configured pattern.
///
/// Plain strings infer their kind: `/.../` is a user regex, text containing
/// whitespace is an ngram, anything else is a word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Plain(String),
    Detailed { pattern: String, kind: MatcherKind },
}

impl PatternSpec {
    pub fn kind(&self) -> MatcherKind {
        match self {
            PatternSpec::Detailed { kind, .. } => *kind,
            PatternSpec::Plain(s) => {
                if s.len() > 2 && s.starts_with('/') && s.ends_with('/') {
                    MatcherKind::Regex
                } else if s.trim().contains(char::is_whitespace) {
                    MatcherKind::Ngram
                } else {
                    MatcherKind::Word
                }
            }
        }
    }

    /// Pattern body (regex slashes stripped).
    pub fn text(&self) -> &str {
        match self {
            PatternSpec::Detailed { pattern, .. } => pattern,
            PatternSpec::Plain(s) => {
                if self.kind() == MatcherKind::Regex {
                    &s[1..s.len() - 1]
                } else {
                    s.trim()
                }
            }
        }
    }
}

impl From<&str> for PatternSpec {
    fn from(s: &str) -> Self {
        PatternSpec::Plain(s.to_string())
    }
}

// --- Rule data --------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub contexts: Vec<ContextDefinition>,
    pub negation: NegationIndicators,
    pub sarcasm: SarcasmIndicators,
    pub intensity: IntensityIndicators,
    pub phrase_edges: Vec<PhraseEdgeDefinition>,
    pub taxonomy: TaxonomyDefinition,
    pub attachment_profiles: BTreeMap<AttachmentStyle, BucketWeights>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextDefinition {
    pub id: String,
    /// Static rank; higher wins ties and truncation.
    pub priority: i32,
    pub bucket: Option<Bucket>,
    /// Plain substrings scored at `ContextTuning::tone_cue_weight` each.
    pub tone_cues: Vec<String>,
    pub weighted_cues: Vec<WeightedCue>,
    pub counter_cues: Vec<PatternSpec>,
    pub format_cues: Option<FormatCues>,
    /// Overrides `ContextTuning::default_cooldown_ms`.
    pub cooldown_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCue {
    pub pattern: PatternSpec,
    #[serde(default = "default_cue_weight")]
    pub weight: f64,
}

fn default_cue_weight() -> f64 {
    0.4
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatCues {
    /// Multiplied by the sentence's caps ratio.
    pub caps_weight: f64,
    /// Per exclamation mark, counting at most three.
    pub exclamation_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegationIndicators {
    /// Extra single-token negators on top of the built-in set.
    pub words: Vec<String>,
    /// Extra multi-token idioms on top of the built-in list.
    pub idioms: Vec<String>,
    /// Complex negation patterns.
    pub patterns: Vec<PatternSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarcasmIndicators {
    pub patterns: Vec<SarcasmIndicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarcasmIndicator {
    pub pattern: PatternSpec,
    #[serde(default = "default_sarcasm_confidence")]
    pub confidence: f64,
}

fn default_sarcasm_confidence() -> f64 {
    0.6
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityIndicators {
    pub modifiers: Vec<IntensityModifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityModifier {
    pub pattern: PatternSpec,
    pub multiplier: f64,
    /// Defaults to `custom`.
    #[serde(default)]
    pub level: Option<crate::detect::intensity::IntensityLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseEdgeDefinition {
    pub id: String,
    pub category: String,
    pub patterns: Vec<PatternSpec>,
    #[serde(default = "default_edge_weight")]
    pub weight: f64,
}

fn default_edge_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyDefinition {
    pub codes: Vec<TaxonomyCode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyCode {
    pub code: String,
    /// Human-readable label, also sent to the zero-shot provider.
    pub label: String,
    pub seeds: Vec<PatternSpec>,
}

impl RuleSet {
    pub fn from_json(doc: &str) -> Result<Self> {
        let rules: RuleSet = serde_json::from_str(doc)?;
        if rules.contexts.iter().any(|c| c.id.trim().is_empty()) {
            return Err(Error::Config("context definition without an id".into()));
        }
        Ok(rules)
    }

    /// Like [`RuleSet::from_json`] but degrades to an empty rule set.
    pub fn from_json_or_empty(doc: &str) -> Self {
        match Self::from_json(doc) {
            Ok(rules) => rules,
            Err(err) => {
                tracing::warn!(error = %err, "rule set unreadable; continuing with empty rules");
                RuleSet::default()
            }
        }
    }

    /// Starter rule set for conversational messages.
    pub fn builtin() -> Self {
        RuleSet {
            contexts: builtin_contexts(),
            negation: NegationIndicators::default(),
            sarcasm: SarcasmIndicators {
                patterns: vec![
                    SarcasmIndicator { pattern: "thanks for nothing".into(), confidence: 0.8 },
                    SarcasmIndicator { pattern: "love that for me".into(), confidence: 0.6 },
                ],
            },
            intensity: IntensityIndicators {
                modifiers: vec![IntensityModifier { pattern: r"/!{3,}/".into(), multiplier: 1.3, level: None }],
            },
            phrase_edges: vec![
                edge("absolutes", "escalation", &["you always", "you never", "everyone", "nobody"]),
                edge("i_statement", "repair", &["i feel", "i need", "i think"]),
                edge("dismissal", "rupture", &["whatever", "calm down", "get over it"]),
            ],
            taxonomy: TaxonomyDefinition {
                codes: vec![
                    code(
                        "P001",
                        "validation / reflective listening",
                        &["i hear you", "that makes sense", "i understand", r"/\bsounds like you\b/"],
                    ),
                    code("P002", "criticism / blame", &["you always", "you never", "your fault", "blame"]),
                    code("P003", "repair attempt / apology", &["i'm sorry", "i apologize", "my fault", "start over"]),
                    code("P004", "boundary setting", &["i need space", "please stop", "not okay", "boundary"]),
                    code("P005", "stonewalling / withdrawal", &["whatever", "i'm done", "leave me alone", "forget it"]),
                    code("P006", "collaborative planning", &["let's plan", "schedule", "how about we", "tomorrow"]),
                ],
            },
            attachment_profiles: BTreeMap::from([
                (AttachmentStyle::Secure, BucketWeights::default()),
                (AttachmentStyle::Anxious, BucketWeights { clear: 0.9, caution: 1.15, alert: 1.1 }),
                (AttachmentStyle::Avoidant, BucketWeights { clear: 1.05, caution: 0.9, alert: 0.95 }),
                (AttachmentStyle::Disorganized, BucketWeights { clear: 0.9, caution: 1.1, alert: 1.2 }),
            ]),
        }
    }
}

fn cue(pattern: &str, weight: f64) -> WeightedCue {
    WeightedCue { pattern: pattern.into(), weight }
}

fn edge(id: &str, category: &str, patterns: &[&str]) -> PhraseEdgeDefinition {
    PhraseEdgeDefinition {
        id: id.into(),
        category: category.into(),
        patterns: patterns.iter().map(|&p| p.into()).collect(),
        weight: 1.0,
    }
}

fn code(code: &str, label: &str, seeds: &[&str]) -> TaxonomyCode {
    TaxonomyCode { code: code.into(), label: label.into(), seeds: seeds.iter().map(|&s| s.into()).collect() }
}

fn builtin_contexts() -> Vec<ContextDefinition> {
    vec![
        ContextDefinition {
            id: "conflict".into(),
            priority: 3,
            bucket: Some(Bucket::Alert),
            tone_cues: vec!["sick of".into(), "fed up".into(), "never listen".into()],
            weighted_cues: vec![
                cue("you always", 0.6),
                cue("you never", 0.6),
                cue("fault", 0.4),
                cue("angry", 0.4),
                cue("hate", 0.5),
                cue(r"/(?i)\bshut up\b/", 0.7),
                cue("argue", 0.35),
                cue("fight", 0.4),
                cue("you", 0.1),
            ],
            counter_cues: vec!["sorry".into(), "love".into()],
            format_cues: Some(FormatCues { caps_weight: 0.3, exclamation_weight: 0.1 }),
            cooldown_ms: None,
        },
        ContextDefinition {
            id: "repair".into(),
            priority: 2,
            bucket: Some(Bucket::Clear),
            tone_cues: vec!["sorry".into(), "apologize".into(), "my fault".into()],
            weighted_cues: vec![
                cue("i'm sorry", 0.6),
                cue("forgive", 0.5),
                cue("make it right", 0.6),
                cue("understand", 0.3),
                cue("i hear you", 0.5),
            ],
            counter_cues: vec!["but".into()],
            format_cues: None,
            cooldown_ms: None,
        },
        ContextDefinition {
            id: "boundary".into(),
            priority: 2,
            bucket: Some(Bucket::Caution),
            tone_cues: vec!["boundary".into(), "boundaries".into()],
            weighted_cues: vec![
                cue("i need space", 0.6),
                cue("not okay", 0.5),
                cue("please stop", 0.6),
                cue("i won't", 0.4),
            ],
            ..Default::default()
        },
        ContextDefinition {
            id: "planning".into(),
            priority: 1,
            bucket: Some(Bucket::Clear),
            tone_cues: vec!["schedule".into(), "plan".into()],
            weighted_cues: vec![
                cue("tomorrow", 0.3),
                cue("meet", 0.3),
                cue("pick up", 0.4),
                cue(r"/(?i)\bat \d{1,2}(:\d{2})?\s*(am|pm)?\b/", 0.4),
            ],
            ..Default::default()
        },
        ContextDefinition {
            id: "co_parenting".into(),
            priority: 2,
            bucket: Some(Bucket::Caution),
            tone_cues: vec!["custody".into()],
            weighted_cues: vec![
                cue("the kids", 0.5),
                cue("pickup", 0.4),
                cue("our son", 0.5),
                cue("our daughter", 0.5),
                cue("school", 0.3),
            ],
            ..Default::default()
        },
        ContextDefinition {
            id: "work/school".into(),
            priority: 1,
            bucket: Some(Bucket::Clear),
            tone_cues: vec!["deadline".into()],
            weighted_cues: vec![
                cue("meeting", 0.4),
                cue("boss", 0.4),
                cue("homework", 0.4),
                cue("class", 0.3),
                cue("project", 0.3),
            ],
            ..Default::default()
        },
        ContextDefinition {
            id: "safety".into(),
            priority: 4,
            bucket: Some(Bucket::Alert),
            tone_cues: vec!["unsafe".into()],
            weighted_cues: vec![cue("scared", 0.6), cue("threaten", 0.7), cue("hurt me", 0.8), cue("afraid", 0.6)],
            cooldown_ms: Some(3000),
            ..Default::default()
        },
        ContextDefinition {
            id: "misunderstanding".into(),
            priority: 1,
            bucket: Some(Bucket::Caution),
            tone_cues: vec!["misunderstood".into()],
            weighted_cues: vec![
                cue("that's not what i meant", 0.7),
                cue("confused", 0.4),
                cue("what do you mean", 0.5),
                cue("i meant", 0.4),
            ],
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_patterns_infer_their_kind() {
        assert_eq!(PatternSpec::from("sorry").kind(), MatcherKind::Word);
        assert_eq!(PatternSpec::from("not at all").kind(), MatcherKind::Ngram);
        let re = PatternSpec::from(r"/\bhm+\b/");
        assert_eq!(re.kind(), MatcherKind::Regex);
        assert_eq!(re.text(), r"\bhm+\b");
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let cfg = EngineConfig::from_json(r#"{ "budget": { "max_tokens": 5 } }"#).unwrap();
        assert_eq!(cfg.budget.max_tokens, 5);
        assert_eq!(cfg.budget.max_chars, 2000);
        assert_eq!(cfg.cache_capacity, 128);
        assert!((cfg.context.repeat_decay - 0.75).abs() < 1e-12);
    }

    #[test]
    fn rule_set_parses_detailed_and_plain_patterns() {
        let doc = r#"{
            "contexts": [{
                "id": "conflict",
                "priority": 2,
                "bucket": "alert",
                "weighted_cues": [
                    { "pattern": "you always", "weight": 0.5 },
                    { "pattern": { "pattern": "argu", "kind": "substring" } }
                ]
            }],
            "attachment_profiles": { "anxious": { "alert": 1.2 } }
        }"#;
        let rules = RuleSet::from_json(doc).unwrap();
        let ctx = &rules.contexts[0];
        assert_eq!(ctx.bucket, Some(Bucket::Alert));
        assert_eq!(ctx.weighted_cues[1].pattern.kind(), MatcherKind::Substring);
        assert!((ctx.weighted_cues[1].weight - 0.4).abs() < 1e-12);
        let anxious = rules.attachment_profiles[&AttachmentStyle::Anxious];
        assert!((anxious.alert - 1.2).abs() < 1e-12);
        assert!((anxious.clear - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unreadable_rules_degrade_to_empty() {
        assert_eq!(RuleSet::from_json_or_empty("not json"), RuleSet::default());
        assert_eq!(RuleSet::from_json_or_empty(r#"{ "contexts": [{ "id": " " }] }"#), RuleSet::default());
    }

    #[test]
    fn dominant_bucket_prefers_severity_on_ties() {
        let scores = BucketScores { clear: 0.5, caution: 0.5, alert: 0.2 };
        assert_eq!(scores.dominant(), Some(Bucket::Caution));
        assert_eq!(BucketScores::default().dominant(), None);
    }

    #[test]
    fn builtin_rules_cover_the_conversation_contexts() {
        let rules = RuleSet::builtin();
        let ids: Vec<&str> = rules.contexts.iter().map(|c| c.id.as_str()).collect();
        for id in ["conflict", "repair", "boundary", "planning", "co_parenting", "work/school", "safety"] {
            assert!(ids.contains(&id), "missing {id}");
        }
        assert!(!rules.taxonomy.codes.is_empty());
    }
}
