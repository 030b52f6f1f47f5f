extern crate self as undertone;

use serde::{Deserialize, Serialize};

#[macro_use]
mod macros;
mod api;
mod classify;
mod config;
mod detect;
mod engine;
mod error;
mod text;

pub use api::{
    AnalysisResult, BudgetReport, CompactResult, ContextSummary, HelperField, HelperProjection, IntensitySummary,
    NegationSummary, SarcasmSummary, process, process_with,
};
pub use classify::context::{ContextClassification, ContextScore, category_for_context};
pub use classify::taxonomy::{TaxonomyResult, TaxonomyScore};
pub use classify::zero_shot::{LabelPrediction, ProviderHealth, ZeroShotProvider, ZeroShotResponse};
pub use config::{
    AttachmentStyle, Bucket, BucketScores, BucketWeights, BudgetConfig, ContextDefinition, ContextTuning,
    EngineConfig, FeatureToggles, FormatCues, IntensityIndicators, IntensityModifier, MatcherKind,
    NegationIndicators, PatternSpec, PhraseEdgeDefinition, RuleSet, SarcasmIndicator, SarcasmIndicators,
    SarcasmTuning, TaxonomyCode, TaxonomyDefinition, TaxonomyTuning, WeightedCue, ZeroShotConfig,
};
pub use detect::dependencies::{DependencyEdge, DependencyRelation};
pub use detect::entities::{Entity, EntityKind};
pub use detect::intensity::{IntensityAnalysis, IntensityLevel, IntensityMarker};
pub use detect::negation::{NegationAnalysis, NegationKind, NegationOccurrence};
pub use detect::phrase_edges::PhraseEdgeHit;
pub use detect::sarcasm::{SarcasmAnalysis, SarcasmKind, SarcasmSignal};
pub use engine::{
    AnalysisMode, AnalysisOptions, Analyzer, CacheStats, Clock, CompileIssue, ENGINE_VERSION, StageTiming, SystemClock,
    Timing,
};
pub use error::{Error, Result};

// --- Shared text types ------------------------------------------------------

/// Coarse part-of-speech tag (Universal Dependencies names).
///
/// Tags come from a fixed lookup/suffix cascade in `text::tokenizer`, not a
/// trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PosTag {
    Pron,
    Aux,
    Verb,
    Adj,
    Adv,
    Noun,
    Propn,
    Det,
    Adp,
    Cconj,
    Num,
    Intj,
    Punct,
    Sym,
    X,
}

/// A token of the normalized input.
///
/// `start`/`end` are byte offsets into the normalized, length-clamped text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Sequence index; strictly increasing with `start`.
    pub index: usize,
    pub pos: PosTag,
    pub lemma: String,
    pub is_alpha: bool,
    pub is_stop: bool,
    pub is_punct: bool,
}

/// A sentence span. Spans are ordered, non-overlapping and together cover the
/// whole clamped text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceSpan {
    pub index: usize,
    /// Start byte index (inclusive).
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
}

impl SentenceSpan {
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn slice<'t>(&self, text: &'t str) -> &'t str {
        text.get(self.start..self.end).unwrap_or("")
    }
}

/// Byte range in the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Range {
    /// Start byte index (inclusive).
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
}

impl Range {
    pub(crate) fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }
}
