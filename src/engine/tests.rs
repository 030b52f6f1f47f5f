use super::*;
use crate::classify::zero_shot::{LabelPrediction, ZeroShotResponse};
use crate::config::BudgetConfig;
use crate::detect::negation::NegationKind;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

static BUILTIN: Lazy<Analyzer> = Lazy::new(|| Analyzer::new(EngineConfig::default(), RuleSet::builtin()));

fn relaxed() -> EngineConfig {
    EngineConfig { budget: BudgetConfig { max_millis: 60_000, ..BudgetConfig::default() }, ..EngineConfig::default() }
}

fn full() -> AnalysisOptions {
    AnalysisOptions::default()
}

struct CountingClock {
    calls: AtomicUsize,
}

impl Clock for CountingClock {
    fn now(&self) -> DateTime<Utc> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }
}

#[test]
fn no_contexts_falls_back_to_general() {
    let analyzer = Analyzer::new(EngineConfig::default(), RuleSet::default());
    let out = analyzer.process("I love you so much!", &full());
    assert_eq!(out.context.label, "general");
    assert!((out.context.confidence - 0.1).abs() < 1e-12);
    assert_eq!(out.context.category, "general");
    assert!(!out.negation.present);
}

#[test]
fn idiom_and_absolute_negations_are_both_found() {
    let result = BUILTIN.analyze("I never said that, not at all!", &full());
    let kinds: Vec<(&str, NegationKind)> =
        result.negation.occurrences.iter().map(|o| (o.trigger.as_str(), o.kind)).collect();
    assert!(kinds.contains(&("never", NegationKind::Absolute)));
    assert!(kinds.contains(&("not at all", NegationKind::MultiToken)));
    assert!(!kinds.iter().any(|(t, _)| *t == "not"));
    assert!(result.negation.count() >= 2);
}

#[test]
fn stacked_praise_reads_as_sarcasm() {
    let out = BUILTIN.process("Oh great, wonderful, just perfect.", &full());
    assert!(out.sarcasm.present);
    assert!(out.sarcasm.sarcasm_score > 0.0);
}

#[test]
fn long_input_is_clamped_to_max_chars() {
    let input = "a".repeat(3000);
    let result = BUILTIN.analyze(&input, &full());
    assert_eq!(result.text.chars().count(), 2000);
    assert!(result.budget.truncated);
}

#[test]
fn token_gate_reports_neutral_defaults() {
    let mut config = relaxed();
    config.budget.max_tokens = 5;
    let analyzer = Analyzer::new(config, RuleSet::builtin());
    let input = vec!["Oh great, wonderful, just perfect."; 7].join(" ");

    let gated = analyzer.analyze(&input, &full());
    assert!(gated.tokens.len() >= 50);
    assert!(gated.budget.token_gated);
    assert_eq!(gated.budget.skipped, vec!["sarcasm", "intensity"]);

    let json = serde_json::to_value(&*gated).unwrap();
    assert_eq!(json["sarcasm"]["hasSarcasm"], false);
    assert_eq!(json["intensity"]["overallIntensity"], 1.0);
    assert!(gated.compact().degraded);

    // The same text under the default budget does compute sarcasm.
    assert!(BUILTIN.analyze(&input, &full()).sarcasm.has_sarcasm);
}

#[test]
fn repeated_calls_are_served_from_cache() {
    let clock = Arc::new(CountingClock { calls: AtomicUsize::new(0) });
    let analyzer = Analyzer::new(relaxed(), RuleSet::builtin()).with_clock(clock.clone());

    let first = analyzer.process("You never listen to me. I'm sick of it!", &full());
    let second = analyzer.process("You never listen to me. I'm sick of it!", &full());

    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(clock.calls.load(Ordering::SeqCst), 1);
    let stats = analyzer.analysis_cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
}

#[test]
fn over_budget_results_are_recomputed() {
    let clock = Arc::new(CountingClock { calls: AtomicUsize::new(0) });
    let mut config = relaxed();
    config.budget.max_millis = 0;
    let analyzer = Analyzer::new(config, RuleSet::builtin()).with_clock(clock.clone());

    let first = analyzer.analyze("Let's plan tomorrow.", &full());
    let second = analyzer.analyze("Let's plan tomorrow.", &full());

    assert!(!first.timing.within_budget);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(clock.calls.load(Ordering::SeqCst), 2);
    let stats = analyzer.analysis_cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (0, 2, 1));
}

#[test]
fn cache_keys_include_options() {
    let analyzer = Analyzer::new(relaxed(), RuleSet::builtin());
    let text = "You always do this.";
    analyzer.analyze(text, &full());
    analyzer.analyze(text, &AnalysisOptions { attachment: Some(AttachmentStyle::Anxious), ..full() });
    analyzer.analyze(text, &AnalysisOptions { mode: AnalysisMode::Fast, ..full() });
    assert_eq!(analyzer.analysis_cache_stats().entries, 3);
}

#[test]
fn whitespace_variants_share_a_cache_entry() {
    let analyzer = Analyzer::new(relaxed(), RuleSet::builtin());
    let a = analyzer.analyze("Let's plan   tomorrow.", &full());
    let b = analyzer.analyze("  Let's plan tomorrow.  ", &full());
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn helpers_have_their_own_cache() {
    let analyzer = Analyzer::new(relaxed(), RuleSet::builtin());
    let fields = HelperField::CONTEXT | HelperField::TONE;
    let first = analyzer.helper("I need space, please stop.", fields);
    let second = analyzer.helper("I need space, please stop.", fields);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.context.as_ref().map(|c| c.label.as_str()), Some("boundary"));
    assert!(first.negation.is_none());
    let stats = analyzer.helper_cache_stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[test]
fn fast_mode_skips_dependencies_only() {
    let text = "I really don't care anymore.";
    let full_result = BUILTIN.analyze(text, &full());
    let fast = BUILTIN.analyze(text, &AnalysisOptions { mode: AnalysisMode::Fast, ..full() });
    assert!(!full_result.dependencies.is_empty());
    assert!(fast.dependencies.is_empty());
    assert_eq!(fast.negation, full_result.negation);
    assert!(fast.budget.skipped.is_empty());
}

#[test]
fn empty_input_yields_a_complete_result() {
    let result = BUILTIN.analyze("", &full());
    assert!(result.tokens.is_empty());
    assert_eq!(result.sentences.len(), 1);
    assert_eq!(result.context.primary.id, "general");
    assert!(result.taxonomy.scores.is_empty());
}

#[test]
fn broken_patterns_are_reported_not_fatal() {
    let mut rules = RuleSet::builtin();
    rules.contexts[0].weighted_cues.push(crate::config::WeightedCue { pattern: "/(unclosed/".into(), weight: 0.5 });
    let analyzer = Analyzer::new(EngineConfig::default(), rules);
    assert_eq!(analyzer.compile_issues().len(), 1);
    assert_eq!(analyzer.process("You always do this!", &full()).context.label, "conflict");
}

#[test]
fn fingerprint_tracks_configuration() {
    let a = Analyzer::new(EngineConfig::default(), RuleSet::builtin());
    let b = Analyzer::new(relaxed(), RuleSet::builtin());
    assert_eq!(a.fingerprint(), Analyzer::new(EngineConfig::default(), RuleSet::builtin()).fingerprint());
    assert_ne!(a.fingerprint(), b.fingerprint());
}

// --- Zero-shot enrichment ---------------------------------------------------

fn ml_config() -> EngineConfig {
    let mut config = relaxed();
    config.zero_shot.enabled = true;
    config.zero_shot.timeout_ms = 200;
    config
}

struct Fixed {
    calls: AtomicUsize,
}

#[async_trait]
impl ZeroShotProvider for Fixed {
    async fn classify(&self, _text: &str, labels: &[String]) -> Result<ZeroShotResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(labels.iter().any(|l| l == "collaborative planning"));
        Ok(ZeroShotResponse {
            predictions: vec![
                LabelPrediction { label: "Collaborative Planning".into(), confidence: 0.9 },
                LabelPrediction { label: "something else".into(), confidence: 0.99 },
            ],
            model: "nli-test".into(),
        })
    }
}

struct Failing {
    calls: AtomicUsize,
}

#[async_trait]
impl ZeroShotProvider for Failing {
    async fn classify(&self, _text: &str, _labels: &[String]) -> Result<ZeroShotResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Provider("model not loaded".into()))
    }
}

struct Hanging;

#[async_trait]
impl ZeroShotProvider for Hanging {
    async fn classify(&self, _text: &str, _labels: &[String]) -> Result<ZeroShotResponse> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn enrichment_replaces_the_cache_entry() {
    let provider = Arc::new(Fixed { calls: AtomicUsize::new(0) });
    let analyzer = Analyzer::new(ml_config(), RuleSet::builtin()).with_provider(provider);
    let text = "Can we talk tomorrow?";

    let first = analyzer.analyze(text, &full());
    assert!(!first.taxonomy.ml_applied);
    assert!(first.taxonomy.scores.is_empty());

    analyzer.settle().await;
    let second = analyzer.analyze(text, &full());
    assert!(second.taxonomy.ml_applied);
    assert_eq!(second.taxonomy.model.as_deref(), Some("nli-test"));
    assert_eq!(second.taxonomy.top_codes(1), vec!["P006"]);
    let p006 = &second.taxonomy.scores[0];
    assert!((p006.score - 1.2).abs() < 1e-9);
    assert_eq!(p006.ml_score, Some(0.9));

    // The result handed out first is untouched.
    assert!(!first.taxonomy.ml_applied);
    assert!(analyzer.ml_enabled());
}

#[tokio::test]
async fn provider_failure_disables_ml_for_the_session() {
    let provider = Arc::new(Failing { calls: AtomicUsize::new(0) });
    let analyzer = Analyzer::new(ml_config(), RuleSet::builtin()).with_provider(provider.clone());

    let result = analyzer.analyze("Let's plan the schedule.", &full());
    analyzer.settle().await;
    assert!(!analyzer.ml_enabled());

    analyzer.analyze("Something else entirely.", &full());
    analyzer.settle().await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert!(!result.taxonomy.ml_applied);
    assert!(!analyzer.analyze("Let's plan the schedule.", &full()).taxonomy.ml_applied);
}

#[tokio::test]
async fn hanging_providers_time_out() {
    let analyzer = Analyzer::new(ml_config(), RuleSet::builtin()).with_provider(Arc::new(Hanging));
    analyzer.analyze("I'm sorry, I hear you.", &full());
    analyzer.settle().await;
    assert!(!analyzer.ml_enabled());
}

#[tokio::test]
async fn shutdown_cancels_pending_enrichment() {
    let mut config = ml_config();
    config.zero_shot.timeout_ms = 60_000;
    let analyzer = Analyzer::new(config, RuleSet::builtin()).with_provider(Arc::new(Hanging));
    analyzer.analyze("I'm sorry, I hear you.", &full());
    analyzer.shutdown();
    analyzer.settle().await;
    // Cancellation is not a provider failure.
    assert!(analyzer.ml_enabled());
}

#[test]
fn no_runtime_means_rules_only() {
    let provider = Arc::new(Fixed { calls: AtomicUsize::new(0) });
    let analyzer = Analyzer::new(ml_config(), RuleSet::builtin()).with_provider(provider.clone());
    let result = analyzer.analyze("Can we talk tomorrow?", &full());
    assert!(!result.taxonomy.ml_applied);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

// --- Properties -------------------------------------------------------------

fn message() -> impl Strategy<Value = String> {
    let words = prop::sample::select(vec![
        "I", "you", "never", "not", "at", "all", "no", "way", "don't", "care", "said", "that", "Oh", "great", "just",
        "perfect", "sorry", "always", "hate", "tomorrow", "plan", "really", "so", "Dr.", "Smith", "$40", ",", ".", "!",
        "?", "...", "\n", "hardly", "fair", "ÉCOLE", "naïve", "🙂",
    ]);
    prop::collection::vec(words, 0..40).prop_map(|w| w.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sentence_spans_tile_the_text(input in message()) {
        let result = BUILTIN.analyze(&input, &full());
        let spans = &result.sentences;
        prop_assert!(!spans.is_empty());
        prop_assert_eq!(spans[0].start, 0);
        prop_assert_eq!(spans[spans.len() - 1].end, result.text.len());
        for (i, pair) in spans.windows(2).enumerate() {
            prop_assert_eq!(pair[0].end, pair[1].start);
            prop_assert_eq!(pair[0].index, i);
        }
    }

    #[test]
    fn tokens_stay_in_bounds_and_in_order(input in message()) {
        let result = BUILTIN.analyze(&input, &full());
        for (i, token) in result.tokens.iter().enumerate() {
            prop_assert_eq!(token.index, i);
            prop_assert!(token.start < token.end);
            prop_assert!(token.end <= result.text.len());
            prop_assert_eq!(&result.text[token.start..token.end], token.text.as_str());
        }
        for pair in result.tokens.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn negation_scopes_stay_in_their_sentence(input in message()) {
        let result = BUILTIN.analyze(&input, &full());
        for occ in &result.negation.occurrences {
            let span = result.sentences.iter().find(|s| s.contains(occ.start)).unwrap();
            prop_assert!(occ.start + occ.scope.len() <= span.end, "{:?} escapes {:?}", occ, span);
        }
    }

    #[test]
    fn confidences_form_a_distribution(input in message()) {
        let context = &BUILTIN.analyze(&input, &full()).context;
        if context.primary.id != "general" {
            let total: f64 = context.ranked.iter().map(|c| c.confidence).sum();
            prop_assert!((total - 1.0).abs() < 1e-6);
        }
        if let Some(secondary) = &context.secondary {
            prop_assert!(context.primary.confidence >= secondary.confidence);
        }
    }

    #[test]
    fn taxonomy_never_reports_below_threshold(input in message()) {
        let result = BUILTIN.analyze(&input, &full());
        let threshold = BUILTIN.config().taxonomy.threshold;
        prop_assert!(result.taxonomy.scores.iter().all(|s| s.score >= threshold));
    }
}
