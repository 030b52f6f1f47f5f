//! Analysis engine.
//!
//! [`Analyzer`] is the public entry point. It owns the compiled rule tables,
//! the two result caches and the optional zero-shot provider.
//!
//! ## How the parts work together
//!
//! ```text
//! RuleSet ── CompiledPatterns::compile ──▶ matcher tables         (compiled.rs)
//!
//! raw ── normalize + clamp ──▶ cache lookup ──hit──▶ Arc<AnalysisResult>
//!                               │ miss                              (cache.rs)
//!                               v
//!              Pipeline::run                                        (pipeline.rs)
//!                tokenize ─▶ token gate ─────────────────────────── (budget.rs)
//!                segment ─▶ TriggerInfo::scan ─▶ entities          (trigger.rs)
//!                negation + dependencies
//!                sarcasm + intensity        (skipped when gated)
//!                context classification
//!                phrase edges ─▶ taxonomy (rules only)
//!                               │
//!                               v
//!              cache insert ──▶ zero-shot enrichment (background, optional)
//! ```
//!
//! Enrichment never touches a result a caller already holds: on success it
//! inserts a *new* result under the same key, so later lookups see the merged
//! taxonomy.
//!
//! ## Responsibilities by module
//!
//! - `compiled.rs`: pattern compilation and the `TextView` matching window.
//! - `trigger.rs`: cheap input signals used to skip detector families.
//! - `budget.rs`: character clamp, token gate, advisory time budget.
//! - `cache.rs`: bounded LRU maps with hit/miss counters.
//! - `metrics.rs`: stage timing and the injectable [`Clock`].
//! - `pipeline.rs`: runs the stages and assembles the result.
//!
//! ## Debugging
//!
//! Set `UNDERTONE_LOG=debug` (CLI) or install any `tracing` subscriber to see
//! per-analysis traces, cache decisions and provider failures.

#[path = "engine/budget.rs"]
mod budget;
#[path = "engine/cache.rs"]
mod cache;
#[path = "engine/compiled.rs"]
pub(crate) mod compiled;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/pipeline.rs"]
mod pipeline;
#[path = "engine/trigger.rs"]
pub(crate) mod trigger;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use cache::CacheStats;
pub use compiled::CompileIssue;
pub use metrics::{Clock, StageTiming, SystemClock, Timing};

use crate::api::{AnalysisResult, CompactResult, HelperField, HelperProjection};
use crate::classify::taxonomy;
use crate::classify::zero_shot::{self, MlSession, ZeroShotProvider};
use crate::config::{AttachmentStyle, EngineConfig, RuleSet};
use budget::Budget;
use cache::{AnalysisKey, HelperKey, LruStore, sha256_hex};
use compiled::CompiledPatterns;
use metrics::StageClock;
use pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Stamped on every result and part of every cache key.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Every stage, including dependency edges.
    #[default]
    Full,
    /// Skips dependency extraction.
    Fast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AnalysisOptions {
    pub mode: AnalysisMode,
    /// Re-weights bucket contributions with the matching attachment profile.
    pub attachment: Option<AttachmentStyle>,
}

struct Caches {
    analyses: LruStore<AnalysisKey, Arc<AnalysisResult>>,
    helpers: LruStore<HelperKey, Arc<HelperProjection>>,
}

/// Message analyzer.
///
/// Cheap to clone; clones share caches, compiled rules and the ML session.
///
/// # Example
/// ```
/// use undertone::{AnalysisOptions, Analyzer, EngineConfig, RuleSet};
///
/// let analyzer = Analyzer::new(EngineConfig::default(), RuleSet::builtin());
/// let out = analyzer.process("You never listen to me.", &AnalysisOptions::default());
/// assert!(out.negation.present);
/// ```
#[derive(Clone)]
pub struct Analyzer {
    config: Arc<EngineConfig>,
    compiled: Arc<CompiledPatterns>,
    fingerprint: Arc<str>,
    caches: Arc<Caches>,
    provider: Option<Arc<dyn ZeroShotProvider>>,
    ml: Arc<MlSession>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Analyzer {
    /// Compile `rules` and set up the caches. Patterns that fail to compile
    /// are dropped and reported through [`Analyzer::compile_issues`].
    pub fn new(config: EngineConfig, rules: RuleSet) -> Self {
        let compiled = CompiledPatterns::compile(&rules, &config.context);
        for issue in &compiled.issues {
            tracing::warn!(source = %issue.source, pattern = %issue.pattern, reason = %issue.reason, "pattern dropped");
        }
        let fingerprint = serde_json::to_vec(&(&config, &rules)).map(|bytes| sha256_hex(&bytes)).unwrap_or_default();
        let caches = Caches {
            analyses: LruStore::new(config.cache_capacity),
            helpers: LruStore::new(config.cache_capacity),
        };
        Self {
            ml: Arc::new(MlSession::new(config.zero_shot.enabled)),
            config: Arc::new(config),
            compiled: Arc::new(compiled),
            fingerprint: fingerprint.into(),
            caches: Arc::new(caches),
            provider: None,
            clock: Arc::new(SystemClock),
            cancel: CancellationToken::new(),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Attach a zero-shot provider. Only consulted when `zero_shot.enabled`.
    pub fn with_provider(mut self, provider: Arc<dyn ZeroShotProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn compile_issues(&self) -> &[CompileIssue] {
        &self.compiled.issues
    }

    /// Hex SHA-256 of the configuration and rules.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether zero-shot scoring is still live for this analyzer.
    pub fn ml_enabled(&self) -> bool {
        self.provider.is_some() && self.config.zero_shot.enabled && self.ml.is_enabled()
    }

    /// Full analysis. Never fails; degraded stages are listed in `budget.skipped`.
    pub fn analyze(&self, text: &str, options: &AnalysisOptions) -> Arc<AnalysisResult> {
        let mut stages = StageClock::start();
        let budget = Budget::new(self.config.budget);
        let (normalized, truncated) = crate::text::normalize_and_clamp(text, budget.max_chars());
        stages.lap("normalize");

        let key = AnalysisKey {
            version: ENGINE_VERSION,
            fingerprint: Arc::clone(&self.fingerprint),
            mode: options.mode,
            attachment: options.attachment,
            text: normalized,
        };
        if let Some(hit) = self.caches.analyses.get_if(&key, |r| r.timing.within_budget) {
            tracing::debug!(content_hash = %hit.content_hash, "analysis served from cache");
            return hit;
        }

        let pipeline = Pipeline { config: &self.config, compiled: &self.compiled };
        let result = Arc::new(pipeline.run(key.text.clone(), truncated, options, self.clock.now(), stages));
        self.caches.analyses.put(key.clone(), Arc::clone(&result));
        self.enrich(key, &result);
        result
    }

    /// Compact analysis for the hot path.
    pub fn process(&self, text: &str, options: &AnalysisOptions) -> CompactResult {
        self.analyze(text, options).compact()
    }

    /// Projection of the requested `fields`, cached separately from full results.
    pub fn helper(&self, text: &str, fields: HelperField) -> Arc<HelperProjection> {
        let (normalized, _) = crate::text::normalize_and_clamp(text, self.config.budget.max_chars);
        let key = HelperKey { fields, text: normalized };
        if let Some(hit) = self.caches.helpers.get(&key) {
            return hit;
        }
        let options = AnalysisOptions { mode: AnalysisMode::Fast, attachment: None };
        let projection = Arc::new(self.analyze(&key.text, &options).project(fields));
        self.caches.helpers.put(key, Arc::clone(&projection));
        projection
    }

    pub fn analysis_cache_stats(&self) -> CacheStats {
        self.caches.analyses.stats()
    }

    pub fn helper_cache_stats(&self) -> CacheStats {
        self.caches.helpers.stats()
    }

    /// Wait for every background enrichment started so far.
    pub async fn settle(&self) {
        let pending: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for task in pending {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "zero-shot enrichment task failed");
            }
        }
    }

    /// Cancel outstanding enrichments. Analysis itself keeps working.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn enrich(&self, key: AnalysisKey, base: &Arc<AnalysisResult>) {
        let Some(provider) = self.provider.clone() else {
            return;
        };
        if !self.config.zero_shot.enabled || !self.ml.is_enabled() || self.compiled.codes.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no tokio runtime; zero-shot enrichment skipped");
            return;
        };

        let labels: Vec<String> = self.compiled.codes.iter().map(|c| c.label.clone()).collect();
        let timeout = Duration::from_millis(self.config.zero_shot.timeout_ms);
        let threshold = self.config.taxonomy.threshold;
        let base = Arc::clone(base);
        let compiled = Arc::clone(&self.compiled);
        let caches = Arc::clone(&self.caches);
        let ml = Arc::clone(&self.ml);
        let cancel = self.cancel.clone();

        let task = runtime.spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = zero_shot::request(provider.as_ref(), &base.text, &labels, timeout) => outcome,
            };
            match outcome {
                Ok(response) => {
                    let ml_scores = taxonomy::ml_scores(&response, &compiled.codes);
                    let merged = taxonomy::merge(
                        &compiled.codes,
                        base.taxonomy.rule_scores.clone(),
                        Some((ml_scores, response.model)),
                        threshold,
                    );
                    tracing::debug!(
                        content_hash = %base.content_hash,
                        retained = merged.scores.len(),
                        "zero-shot scores merged"
                    );
                    let mut enriched = AnalysisResult::clone(&base);
                    enriched.taxonomy = merged;
                    caches.analyses.put(key, Arc::new(enriched));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "zero-shot request failed");
                    ml.disable(&err);
                }
            }
        });

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(task);
        }
    }
}
