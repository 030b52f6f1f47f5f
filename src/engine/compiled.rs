//! Pattern compilation.
//!
//! This module holds the *static* side of the engine: the matcher tables derived
//! once from the injected [`RuleSet`] and shared read-only by every analysis.
//!
//! Configuration patterns are semi-trusted data, so compilation is per entry:
//! a pattern that fails to compile becomes a [`CompileIssue`] and is left out of
//! its table. Nothing here aborts construction.
//!
//! ## Matchers
//!
//! ```text
//! PatternSpec ──kind──┬─ substring ─▶ Matcher::Substring  (?i) escaped text
//!                     ├─ word      ─▶ Matcher::Word       (?i)\b escaped \b
//!                     ├─ regex     ─▶ Matcher::Regex      as written, size-limited
//!                     └─ ngram     ─▶ Matcher::Ngram      token sequence (text or lemma)
//! ```
//!
//! Every matcher reports absolute byte ranges over a [`TextView`], which is the
//! whole text or one sentence of it.
//!
//! ## Invariants
//!
//! - Table order follows configuration order; scoring iterates tables in that
//!   order, which keeps results deterministic.
//! - `CompiledContext::tone_cues` are stored lowercased.

use crate::config::{
    AttachmentStyle, Bucket, BucketWeights, ContextTuning, FormatCues, MatcherKind, PatternSpec, RuleSet,
};
use crate::detect::intensity::IntensityLevel;
use crate::detect::negation::BUILTIN_IDIOMS;
use crate::error::{Error, Result};
use crate::text::split_words;
use crate::{Range, SentenceSpan, Token};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

const REGEX_SIZE_LIMIT: usize = 1 << 20;

// --- Views -------------------------------------------------------------------

/// The region of normalized text a matcher runs over.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TextView<'a> {
    pub text: &'a str,
    pub window: Range,
    /// Tokens lying inside `window`.
    pub tokens: &'a [Token],
}

impl<'a> TextView<'a> {
    pub(crate) fn whole(text: &'a str, tokens: &'a [Token]) -> Self {
        TextView { text, window: Range { start: 0, end: text.len() }, tokens }
    }

    pub(crate) fn sentence(text: &'a str, tokens: &'a [Token], span: &SentenceSpan) -> Self {
        let first = tokens.partition_point(|t| t.start < span.start);
        let last = tokens.partition_point(|t| t.end <= span.end);
        let tokens = if first <= last { &tokens[first..last] } else { &tokens[0..0] };
        TextView { text, window: Range { start: span.start, end: span.end }, tokens }
    }

    pub(crate) fn slice(&self) -> &'a str {
        self.text.get(self.window.start..self.window.end).unwrap_or("")
    }
}

// --- Matchers ----------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    Substring(Regex),
    Word(Regex),
    Regex(Regex),
    Ngram(Vec<String>),
}

impl Matcher {
    pub(crate) fn compile(spec: &PatternSpec) -> Result<Self> {
        let body = spec.text();
        if body.trim().is_empty() {
            return Err(Error::Pattern { pattern: body.to_string(), reason: "empty pattern".into() });
        }
        match spec.kind() {
            MatcherKind::Substring => build(&format!("(?i){}", regex::escape(body))).map(Matcher::Substring),
            MatcherKind::Word => build(&format!(r"(?i)\b{}\b", regex::escape(body))).map(Matcher::Word),
            MatcherKind::Regex => build(body).map(Matcher::Regex),
            MatcherKind::Ngram => {
                let lower = body.to_lowercase();
                let parts: Vec<String> = split_words(&lower).into_iter().map(String::from).collect();
                if parts.is_empty() {
                    return Err(Error::Pattern { pattern: body.to_string(), reason: "no words".into() });
                }
                Ok(Matcher::Ngram(parts))
            }
        }
    }

    /// Non-overlapping matches inside the view, in order.
    pub(crate) fn find_all(&self, view: &TextView) -> Vec<Range> {
        match self {
            Matcher::Substring(re) | Matcher::Word(re) | Matcher::Regex(re) => re
                .find_iter(view.slice())
                .filter(|m| !m.as_str().is_empty())
                .map(|m| Range { start: view.window.start + m.start(), end: view.window.start + m.end() })
                .collect(),
            Matcher::Ngram(parts) => {
                let mut found = Vec::new();
                let n = parts.len();
                let mut i = 0;
                while n > 0 && i + n <= view.tokens.len() {
                    let window = &view.tokens[i..i + n];
                    if window.iter().zip(parts).all(|(tok, part)| token_equals(tok, part)) {
                        found.push(Range { start: window[0].start, end: window[n - 1].end });
                        i += n;
                    } else {
                        i += 1;
                    }
                }
                found
            }
        }
    }

    pub(crate) fn is_match(&self, view: &TextView) -> bool {
        match self {
            Matcher::Substring(re) | Matcher::Word(re) | Matcher::Regex(re) => re.is_match(view.slice()),
            Matcher::Ngram(_) => !self.find_all(view).is_empty(),
        }
    }
}

fn token_equals(tok: &Token, part: &str) -> bool {
    tok.lemma == part || tok.text.chars().flat_map(char::to_lowercase).eq(part.chars())
}

fn build(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|err| Error::Pattern { pattern: pattern.to_string(), reason: err.to_string() })
}

/// A configuration entry that was skipped at compile time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileIssue {
    /// Where the entry lives, e.g. `contexts[conflict].weighted_cues[2]`.
    pub source: String,
    pub pattern: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    /// Pattern text as configured; reported in matched-pattern lists.
    pub source: String,
    pub matcher: Matcher,
}

// --- Tables ------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct WeightedMatcher {
    pub pattern: CompiledPattern,
    pub weight: f64,
    /// Generic tokens (pronouns, fillers) have their contribution capped.
    pub generic: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledContext {
    pub id: String,
    pub priority: i32,
    pub bucket: Option<Bucket>,
    pub tone_cues: Vec<String>,
    pub weighted: Vec<WeightedMatcher>,
    pub counter: Vec<CompiledPattern>,
    pub format: Option<FormatCues>,
    pub cooldown_ms: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledNegation {
    /// Extra single-token negators (lowercased).
    pub words: HashSet<String>,
    /// Built-in plus configured multi-token idioms.
    pub idioms: Vec<CompiledPattern>,
    pub patterns: Vec<CompiledPattern>,
}

#[derive(Debug, Clone)]
pub(crate) struct SarcasmMatcher {
    pub pattern: CompiledPattern,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct IntensityMatcher {
    pub pattern: CompiledPattern,
    pub level: IntensityLevel,
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledEdge {
    pub id: String,
    pub category: String,
    pub weight: f64,
    pub patterns: Vec<CompiledPattern>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledCode {
    pub code: String,
    pub label: String,
    /// Label key used to map zero-shot predictions back to codes.
    pub label_key: String,
    pub seeds: Vec<CompiledPattern>,
}

/// Every matcher table the detectors and classifiers consume.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledPatterns {
    pub contexts: Vec<CompiledContext>,
    pub negation: CompiledNegation,
    pub sarcasm: Vec<SarcasmMatcher>,
    pub intensity: Vec<IntensityMatcher>,
    pub edges: Vec<CompiledEdge>,
    pub codes: Vec<CompiledCode>,
    pub attachment: BTreeMap<AttachmentStyle, BucketWeights>,
    pub issues: Vec<CompileIssue>,
}

impl CompiledPatterns {
    /// Compile `rules`. Individual failures are collected in `issues`.
    pub(crate) fn compile(rules: &RuleSet, tuning: &ContextTuning) -> Self {
        let mut compiler = Compiler { issues: Vec::new() };
        let generic: HashSet<String> = tuning.generic_tokens.iter().map(|t| t.to_lowercase()).collect();

        let contexts = rules
            .contexts
            .iter()
            .filter(|def| !def.id.trim().is_empty())
            .map(|def| {
                let weighted = def
                    .weighted_cues
                    .iter()
                    .enumerate()
                    .filter_map(|(i, cue)| {
                        let source = format!("contexts[{}].weighted_cues[{i}]", def.id);
                        let pattern = compiler.pattern(&source, &cue.pattern)?;
                        let is_generic = generic.contains(&cue.pattern.text().to_lowercase());
                        Some(WeightedMatcher { pattern, weight: cue.weight, generic: is_generic })
                    })
                    .collect();
                let counter = compiler.patterns(&format!("contexts[{}].counter_cues", def.id), &def.counter_cues);
                CompiledContext {
                    id: def.id.clone(),
                    priority: def.priority,
                    bucket: def.bucket,
                    tone_cues: def.tone_cues.iter().map(|c| c.to_lowercase()).filter(|c| !c.is_empty()).collect(),
                    weighted,
                    counter,
                    format: def.format_cues,
                    cooldown_ms: def.cooldown_ms,
                }
            })
            .collect();

        let idiom_specs: Vec<PatternSpec> = BUILTIN_IDIOMS
            .iter()
            .map(|&i| i.to_string())
            .chain(rules.negation.idioms.iter().cloned())
            .map(|text| PatternSpec::Detailed { pattern: text, kind: MatcherKind::Word })
            .collect();
        let negation = CompiledNegation {
            words: rules.negation.words.iter().map(|w| w.trim().to_lowercase()).filter(|w| !w.is_empty()).collect(),
            idioms: compiler.patterns("negation.idioms", &idiom_specs),
            patterns: compiler.patterns("negation.patterns", &rules.negation.patterns),
        };

        let sarcasm = rules
            .sarcasm
            .patterns
            .iter()
            .enumerate()
            .filter_map(|(i, ind)| {
                let pattern = compiler.pattern(&format!("sarcasm.patterns[{i}]"), &ind.pattern)?;
                Some(SarcasmMatcher { pattern, confidence: ind.confidence.clamp(0.0, 1.0) })
            })
            .collect();

        let intensity = rules
            .intensity
            .modifiers
            .iter()
            .enumerate()
            .filter_map(|(i, m)| {
                let pattern = compiler.pattern(&format!("intensity.modifiers[{i}]"), &m.pattern)?;
                Some(IntensityMatcher {
                    pattern,
                    level: m.level.unwrap_or(IntensityLevel::Custom),
                    multiplier: m.multiplier,
                })
            })
            .collect();

        let edges = rules
            .phrase_edges
            .iter()
            .map(|def| CompiledEdge {
                id: def.id.clone(),
                category: def.category.clone(),
                weight: def.weight,
                patterns: compiler.patterns(&format!("phrase_edges[{}]", def.id), &def.patterns),
            })
            .collect();

        let codes = rules
            .taxonomy
            .codes
            .iter()
            .filter(|c| !c.code.trim().is_empty())
            .map(|c| CompiledCode {
                code: c.code.clone(),
                label: c.label.clone(),
                label_key: label_key(&c.label),
                seeds: compiler.patterns(&format!("taxonomy[{}].seeds", c.code), &c.seeds),
            })
            .collect();

        for issue in &compiler.issues {
            tracing::warn!(source = %issue.source, pattern = %issue.pattern, reason = %issue.reason, "pattern skipped");
        }

        CompiledPatterns {
            contexts,
            negation,
            sarcasm,
            intensity,
            edges,
            codes,
            attachment: rules.attachment_profiles.clone(),
            issues: compiler.issues,
        }
    }
}

/// Normalized label text: lowercase alphanumeric words joined by single spaces.
pub(crate) fn label_key(label: &str) -> String {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

struct Compiler {
    issues: Vec<CompileIssue>,
}

impl Compiler {
    fn pattern(&mut self, source: &str, spec: &PatternSpec) -> Option<CompiledPattern> {
        match Matcher::compile(spec) {
            Ok(matcher) => Some(CompiledPattern { source: spec.text().to_string(), matcher }),
            Err(err) => {
                let reason = match err {
                    Error::Pattern { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.issues.push(CompileIssue { source: source.to_string(), pattern: spec.text().to_string(), reason });
                None
            }
        }
    }

    fn patterns(&mut self, source: &str, specs: &[PatternSpec]) -> Vec<CompiledPattern> {
        specs.iter().enumerate().filter_map(|(i, spec)| self.pattern(&format!("{source}[{i}]"), spec)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContextDefinition, WeightedCue};
    use crate::text::{segment_sentences, tokenize};

    fn whole(text: &str) -> (String, Vec<Token>) {
        (text.to_string(), tokenize(text))
    }

    #[test]
    fn word_matchers_respect_boundaries() {
        let m = Matcher::compile(&PatternSpec::from("fault")).unwrap();
        let (text, tokens) = whole("Default? It's your FAULT.");
        let hits = m.find_all(&TextView::whole(&text, &tokens));
        assert_eq!(hits, vec![Range { start: 19, end: 24 }]);
    }

    #[test]
    fn substring_matchers_ignore_boundaries() {
        let spec = PatternSpec::Detailed { pattern: "argu".into(), kind: MatcherKind::Substring };
        let m = Matcher::compile(&spec).unwrap();
        let (text, tokens) = whole("We Argued and argue");
        assert_eq!(m.find_all(&TextView::whole(&text, &tokens)).len(), 2);
    }

    #[test]
    fn ngrams_match_token_text_or_lemma() {
        let m = Matcher::compile(&PatternSpec::from("i hear you")).unwrap();
        let (text, tokens) = whole("Okay, I heard you.");
        let hits = m.find_all(&TextView::whole(&text, &tokens));
        assert_eq!(hits, vec![Range { start: 6, end: 17 }]);
    }

    #[test]
    fn sentence_views_restrict_matches() {
        let m = Matcher::compile(&PatternSpec::from("no")).unwrap();
        let text = "No way. Fine, no.";
        let tokens = tokenize(text);
        let spans = segment_sentences(text);
        let second = TextView::sentence(text, &tokens, &spans[1]);
        assert_eq!(second.tokens.first().map(|t| t.text.as_str()), Some("Fine"));
        assert_eq!(m.find_all(&second), vec![Range { start: 14, end: 16 }]);
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let rules = RuleSet {
            contexts: vec![ContextDefinition {
                id: "conflict".into(),
                weighted_cues: vec![
                    WeightedCue { pattern: "/(unclosed/".into(), weight: 0.5 },
                    WeightedCue { pattern: "fight".into(), weight: 0.5 },
                    WeightedCue { pattern: "you".into(), weight: 0.5 },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let compiled = CompiledPatterns::compile(&rules, &ContextTuning::default());
        assert_eq!(compiled.contexts[0].weighted.len(), 2);
        assert!(compiled.contexts[0].weighted[1].generic);
        assert_eq!(compiled.issues.len(), 1);
        assert_eq!(compiled.issues[0].source, "contexts[conflict].weighted_cues[0]");
    }

    #[test]
    fn builtin_idioms_are_always_compiled() {
        let compiled = CompiledPatterns::compile(&RuleSet::default(), &ContextTuning::default());
        assert_eq!(compiled.negation.idioms.len(), BUILTIN_IDIOMS.len());
        assert!(compiled.issues.is_empty());
    }

    #[test]
    fn label_keys_normalize_punctuation() {
        assert_eq!(label_key("Validation / Reflective-Listening"), "validation reflective listening");
    }
}
