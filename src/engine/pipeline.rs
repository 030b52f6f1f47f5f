//! One analysis, stage by stage.
//!
//! Normalization happens in the caller (its output is the cache key); this
//! module runs everything after it and assembles the [`AnalysisResult`].

use super::budget::{Budget, Gate};
use super::cache::sha256_hex;
use super::compiled::{CompiledPatterns, TextView};
use super::metrics::StageClock;
use super::trigger::TriggerInfo;
use super::{AnalysisMode, AnalysisOptions, ENGINE_VERSION};
use crate::api::{AnalysisResult, BudgetReport};
use crate::classify::context::{self, ContextInput};
use crate::classify::taxonomy;
use crate::config::EngineConfig;
use crate::detect::intensity::IntensityAnalysis;
use crate::detect::sarcasm::SarcasmAnalysis;
use crate::detect::{dependencies, entities, intensity, negation, phrase_edges, sarcasm};
use crate::text::{segment_sentences, tokenize};
use chrono::{DateTime, Utc};

pub(crate) struct Pipeline<'a> {
    pub config: &'a EngineConfig,
    pub compiled: &'a CompiledPatterns,
}

impl Pipeline<'_> {
    /// Analyze already-normalized `text`. `stages` should have been started
    /// before normalization so the total covers it.
    pub(crate) fn run(
        &self,
        text: String,
        truncated: bool,
        options: &AnalysisOptions,
        analyzed_at: DateTime<Utc>,
        mut stages: StageClock,
    ) -> AnalysisResult {
        let budget = Budget::new(self.config.budget);
        let mut report = BudgetReport { truncated, ..BudgetReport::default() };

        let tokens = tokenize(&text);
        stages.lap("tokenize");
        let gate = budget.gate(tokens.len());
        report.token_gated = gate == Gate::SkipExpensive;

        let sentences = segment_sentences(&text);
        stages.lap("segment");

        let triggers = TriggerInfo::scan(&text);
        let entities = entities::extract(&text, triggers.signals);
        stages.lap("entities");

        let negation = negation::detect(&text, &tokens, &sentences, &self.compiled.negation);
        let dependencies = match options.mode {
            AnalysisMode::Full => dependencies::extract(&tokens, &sentences, &negation),
            AnalysisMode::Fast => Vec::new(),
        };
        stages.lap("negation");

        let view = TextView::whole(&text, &tokens);
        let (sarcasm, intensity) = match gate {
            Gate::Proceed => (
                sarcasm::detect(&view, triggers.signals, &self.compiled.sarcasm, &self.config.sarcasm),
                intensity::detect(&view, &self.compiled.intensity),
            ),
            Gate::SkipExpensive => {
                report.skipped.extend(["sarcasm".to_string(), "intensity".to_string()]);
                (SarcasmAnalysis::default(), IntensityAnalysis::default())
            }
        };
        stages.lap("sarcasm_intensity");

        let context = context::classify(&ContextInput {
            text: &text,
            tokens: &tokens,
            sentences: &sentences,
            contexts: &self.compiled.contexts,
            tuning: &self.config.context,
            toggles: &self.config.toggles,
            negation: &negation,
            sarcasm: &sarcasm,
            attachment: options.attachment.and_then(|style| self.compiled.attachment.get(&style)),
        });
        stages.lap("context");

        let phrase_edges = phrase_edges::detect(&view, &self.compiled.edges);
        stages.lap("phrase_edges");

        let tuning = self.config.taxonomy;
        let rule_scores = taxonomy::rule_scores(&view, &self.compiled.codes, tuning.rule_increment);
        let taxonomy = taxonomy::merge(&self.compiled.codes, rule_scores, None, tuning.threshold);
        stages.lap("taxonomy");

        report.over_time = budget.check_time(stages.elapsed());
        let timing = stages.finish(budget.max_millis());

        tracing::debug!(
            tokens = tokens.len(),
            sentences = sentences.len(),
            context = %context.primary.id,
            total_micros = timing.total_micros,
            "analysis complete"
        );

        AnalysisResult {
            version: ENGINE_VERSION.to_string(),
            content_hash: sha256_hex(text.as_bytes()),
            analyzed_at,
            mode: options.mode,
            attachment: options.attachment,
            tokens,
            sentences,
            entities,
            negation,
            sarcasm,
            intensity,
            dependencies,
            phrase_edges,
            context,
            taxonomy,
            budget: report,
            timing,
            text,
        }
    }
}
