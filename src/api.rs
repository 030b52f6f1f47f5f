use crate::classify::context::{ContextClassification, category_for_context};
use crate::classify::taxonomy::TaxonomyResult;
use crate::config::{AttachmentStyle, Bucket, EngineConfig, RuleSet};
use crate::detect::dependencies::DependencyEdge;
use crate::detect::entities::Entity;
use crate::detect::intensity::{IntensityAnalysis, IntensityLevel};
use crate::detect::negation::NegationAnalysis;
use crate::detect::phrase_edges::PhraseEdgeHit;
use crate::detect::sarcasm::SarcasmAnalysis;
use crate::engine::{AnalysisMode, AnalysisOptions, Analyzer, Timing};
use crate::error::{Error, Result};
use crate::{SentenceSpan, Token};
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

static DEFAULT_ANALYZER: Lazy<Analyzer> = Lazy::new(|| Analyzer::new(EngineConfig::default(), RuleSet::builtin()));

/// What the budget controller did to one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetReport {
    /// Input was longer than `max_chars` and got clamped.
    pub truncated: bool,
    /// Token count exceeded `max_tokens`.
    pub token_gated: bool,
    /// Wall clock exceeded `max_millis` (advisory).
    pub over_time: bool,
    /// Stages that did not run.
    pub skipped: Vec<String>,
}

/// Full analysis of one message.
///
/// `start`/`end` offsets anywhere inside are byte offsets into `text`, the
/// normalized and clamped input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub version: String,
    /// Hex SHA-256 of `text`.
    pub content_hash: String,
    pub analyzed_at: DateTime<Utc>,
    pub mode: AnalysisMode,
    pub attachment: Option<AttachmentStyle>,
    pub text: String,
    pub tokens: Vec<Token>,
    pub sentences: Vec<SentenceSpan>,
    pub entities: Vec<Entity>,
    pub negation: NegationAnalysis,
    pub sarcasm: SarcasmAnalysis,
    pub intensity: IntensityAnalysis,
    pub dependencies: Vec<DependencyEdge>,
    pub phrase_edges: Vec<PhraseEdgeHit>,
    pub context: ContextClassification,
    pub taxonomy: TaxonomyResult,
    pub budget: BudgetReport,
    pub timing: Timing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub label: String,
    pub score: f64,
    pub confidence: f64,
    pub category: String,
    pub secondary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegationSummary {
    pub present: bool,
    pub count: usize,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarcasmSummary {
    pub present: bool,
    pub sarcasm_score: f64,
    pub signals: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntensitySummary {
    pub overall_intensity: f64,
    pub dominant_level: Option<IntensityLevel>,
}

/// Flat result for the hot path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactResult {
    pub version: String,
    pub content_hash: String,
    pub analyzed_at: DateTime<Utc>,
    pub context: ContextSummary,
    pub tone: Option<Bucket>,
    pub entities: Vec<Entity>,
    pub negation: NegationSummary,
    pub sarcasm: SarcasmSummary,
    pub intensity: IntensitySummary,
    pub phrase_edges: Vec<PhraseEdgeHit>,
    /// Retained taxonomy codes, best first.
    pub taxonomy: Vec<String>,
    /// Some stage was skipped by the budget controller.
    pub degraded: bool,
}

bitflags! {
    /// Fields a helper projection should carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HelperField: u8 {
        const CONTEXT   = 1 << 0;
        const TONE      = 1 << 1;
        const NEGATION  = 1 << 2;
        const SARCASM   = 1 << 3;
        const INTENSITY = 1 << 4;
        const ENTITIES  = 1 << 5;
        const EDGES     = 1 << 6;
        const TAXONOMY  = 1 << 7;
    }
}

impl HelperField {
    /// Parse a comma-separated list such as `"context,sarcasm"`. `all` selects every field.
    pub fn parse_list(list: &str) -> Result<Self> {
        let mut fields = HelperField::empty();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name.eq_ignore_ascii_case("all") {
                fields |= HelperField::all();
                continue;
            }
            let flag = HelperField::from_name(&name.to_ascii_uppercase())
                .ok_or_else(|| Error::Config(format!("unknown helper field '{name}'")))?;
            fields |= flag;
        }
        Ok(fields)
    }
}

/// Subset of a [`CompactResult`]; unrequested fields are absent from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperProjection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<Bucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negation: Option<NegationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sarcasm: Option<SarcasmSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<IntensitySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phrase_edges: Option<Vec<PhraseEdgeHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Vec<String>>,
}

impl AnalysisResult {
    pub fn compact(&self) -> CompactResult {
        CompactResult {
            version: self.version.clone(),
            content_hash: self.content_hash.clone(),
            analyzed_at: self.analyzed_at,
            context: self.context_summary(),
            tone: self.context.tone,
            entities: self.entities.clone(),
            negation: self.negation_summary(),
            sarcasm: self.sarcasm_summary(),
            intensity: self.intensity_summary(),
            phrase_edges: self.phrase_edges.clone(),
            taxonomy: self.taxonomy_codes(),
            degraded: !self.budget.skipped.is_empty(),
        }
    }

    pub fn project(&self, fields: HelperField) -> HelperProjection {
        let pick = |flag: HelperField| fields.contains(flag);
        HelperProjection {
            context: pick(HelperField::CONTEXT).then(|| self.context_summary()),
            tone: if pick(HelperField::TONE) { self.context.tone } else { None },
            negation: pick(HelperField::NEGATION).then(|| self.negation_summary()),
            sarcasm: pick(HelperField::SARCASM).then(|| self.sarcasm_summary()),
            intensity: pick(HelperField::INTENSITY).then(|| self.intensity_summary()),
            entities: pick(HelperField::ENTITIES).then(|| self.entities.clone()),
            phrase_edges: pick(HelperField::EDGES).then(|| self.phrase_edges.clone()),
            taxonomy: pick(HelperField::TAXONOMY).then(|| self.taxonomy_codes()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn context_summary(&self) -> ContextSummary {
        let primary = &self.context.primary;
        ContextSummary {
            label: primary.id.clone(),
            score: primary.score,
            confidence: primary.confidence,
            category: category_for_context(&primary.id).to_string(),
            secondary: self.context.secondary.as_ref().map(|s| s.id.clone()),
        }
    }

    fn negation_summary(&self) -> NegationSummary {
        NegationSummary {
            present: self.negation.present,
            count: self.negation.count(),
            triggers: self.negation.occurrences.iter().map(|o| o.trigger.clone()).collect(),
        }
    }

    fn sarcasm_summary(&self) -> SarcasmSummary {
        SarcasmSummary {
            present: self.sarcasm.has_sarcasm,
            sarcasm_score: self.sarcasm.sarcasm_score,
            signals: self.sarcasm.signals.len(),
        }
    }

    fn intensity_summary(&self) -> IntensitySummary {
        IntensitySummary {
            overall_intensity: self.intensity.overall_intensity,
            dominant_level: self.intensity.dominant_level,
        }
    }

    fn taxonomy_codes(&self) -> Vec<String> {
        self.taxonomy.scores.iter().map(|s| s.code.clone()).collect()
    }
}

impl CompactResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Analyze `text` with the built-in rules and default configuration.
///
/// # Example
/// ```
/// use undertone::process;
///
/// let out = process("I'm sorry, I hear you.");
/// assert_eq!(out.context.label, "repair");
/// ```
pub fn process(text: &str) -> CompactResult {
    DEFAULT_ANALYZER.process(text, &AnalysisOptions::default())
}

/// Like [`process`], with an attachment style.
pub fn process_with(text: &str, attachment: Option<AttachmentStyle>) -> CompactResult {
    DEFAULT_ANALYZER.process(text, &AnalysisOptions { attachment, ..AnalysisOptions::default() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_fields_parse_from_lists() {
        assert_eq!(
            HelperField::parse_list("context, sarcasm").unwrap(),
            HelperField::CONTEXT | HelperField::SARCASM
        );
        assert_eq!(HelperField::parse_list("all").unwrap(), HelperField::all());
        assert!(HelperField::parse_list("mood").is_err());
    }

    #[test]
    fn projections_only_carry_requested_fields() {
        let result = DEFAULT_ANALYZER.analyze("You never listen to me.", &AnalysisOptions::default());
        let projection = result.project(HelperField::NEGATION | HelperField::TAXONOMY);
        assert!(projection.context.is_none());
        assert!(projection.negation.as_ref().is_some_and(|n| n.present));
        let json = serde_json::to_value(&projection).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["negation", "taxonomy"]);
    }

    #[test]
    fn compact_mirrors_the_full_result() {
        let result = DEFAULT_ANALYZER.analyze("I'm sorry, I hear you.", &AnalysisOptions::default());
        let compact = result.compact();
        assert_eq!(compact.context.label, result.context.primary.id);
        assert_eq!(compact.context.category, "repair");
        assert_eq!(compact.content_hash, result.content_hash);
        assert!(!compact.degraded);
    }

    #[test]
    fn compact_json_uses_camel_case() {
        let json = serde_json::to_value(process("Oh great, another meeting.")).unwrap();
        assert!(json["sarcasm"].get("sarcasmScore").is_some());
        assert!(json["intensity"].get("overallIntensity").is_some());
        assert!(json.get("contentHash").is_some());
    }
}
