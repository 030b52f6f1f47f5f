//! Negation finder.
//!
//! Candidates come from three sources, in precedence order:
//!
//! 1. multi-token idioms ("not at all", "no longer"), matched over raw text;
//! 2. complex patterns (built-in "hardly"/"far from"... plus configured ones);
//! 3. single trigger tokens (built-in set, configured extras, any `-n't`).
//!
//! Overlapping candidates are resolved by precedence, so "not at all" swallows
//! the bare "not" inside it. Each surviving trigger gets exactly one head token
//! and a scope string that stops at the nearest clause punctuation and never
//! leaves the trigger's sentence.

use crate::engine::compiled::{CompiledNegation, TextView};
use crate::text::sentence_index_of;
use crate::{PosTag, Range, SentenceSpan, Token};
use serde::{Deserialize, Serialize};

/// Idioms that are always recognised, on top of configured ones.
pub(crate) const BUILTIN_IDIOMS: &[&str] = &[
    "not really",
    "no longer",
    "not at all",
    "not anymore",
    "not even",
    "not quite",
    "no way",
    "no more",
    "never again",
    "by no means",
    "none at all",
];

/// Head search radius, in tokens.
const HEAD_WINDOW: usize = 6;
/// Longest scope, in characters after the trigger.
const SCOPE_CHARS: usize = 60;

const HEAD_PREFERENCE: [PosTag; 3] = [PosTag::Verb, PosTag::Aux, PosTag::Adj];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegationKind {
    Simple,
    Contraction,
    Absolute,
    MultiToken,
    ComplexPattern,
}

impl NegationKind {
    /// Lower wins when candidates overlap.
    fn precedence(self) -> u8 {
        match self {
            NegationKind::MultiToken => 0,
            NegationKind::ComplexPattern => 1,
            NegationKind::Simple | NegationKind::Contraction | NegationKind::Absolute => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegationOccurrence {
    pub trigger: String,
    pub start: usize,
    pub end: usize,
    /// Index of the negated token.
    pub head: usize,
    pub head_text: String,
    pub scope: String,
    pub kind: NegationKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegationAnalysis {
    pub present: bool,
    pub occurrences: Vec<NegationOccurrence>,
}

impl NegationAnalysis {
    pub fn count(&self) -> usize {
        self.occurrences.len()
    }

    /// Whether a negation trigger starts inside `span`.
    pub(crate) fn within(&self, span: &SentenceSpan) -> bool {
        self.occurrences.iter().any(|o| span.contains(o.start))
    }
}

struct Candidate {
    range: Range,
    kind: NegationKind,
}

pub(crate) fn detect(
    text: &str,
    tokens: &[Token],
    sentences: &[SentenceSpan],
    table: &CompiledNegation,
) -> NegationAnalysis {
    let view = TextView::whole(text, tokens);
    let mut candidates: Vec<Candidate> = Vec::new();

    for idiom in &table.idioms {
        for range in idiom.matcher.find_all(&view) {
            candidates.push(Candidate { range, kind: NegationKind::MultiToken });
        }
    }

    let builtin_complex = regex!(r"(?i)\b(?:hardly|barely|scarcely|far from|rarely|seldom)\b");
    for m in builtin_complex.find_iter(text) {
        candidates.push(Candidate { range: Range { start: m.start(), end: m.end() }, kind: NegationKind::ComplexPattern });
    }
    for pattern in &table.patterns {
        for range in pattern.matcher.find_all(&view) {
            candidates.push(Candidate { range, kind: NegationKind::ComplexPattern });
        }
    }

    for token in tokens {
        if let Some(kind) = single_token_kind(token, table) {
            candidates.push(Candidate { range: Range { start: token.start, end: token.end }, kind });
        }
    }

    // Multi-token triggers may not straddle a sentence boundary.
    candidates.retain(|c| {
        sentences.get(sentence_index_of(sentences, c.range.start)).is_none_or(|s| c.range.end <= s.end)
    });

    // Precedence first, then position; the first of any overlapping pair survives.
    candidates.sort_by_key(|c| (c.kind.precedence(), c.range.start, std::cmp::Reverse(c.range.end)));
    let mut accepted: Vec<Candidate> = Vec::new();
    for cand in candidates {
        if accepted.iter().all(|a| !a.range.overlaps(&cand.range)) {
            accepted.push(cand);
        }
    }
    accepted.sort_by_key(|c| c.range.start);

    let occurrences: Vec<NegationOccurrence> =
        accepted.into_iter().filter_map(|cand| resolve(text, tokens, sentences, cand)).collect();

    NegationAnalysis { present: !occurrences.is_empty(), occurrences }
}

fn single_token_kind(token: &Token, table: &CompiledNegation) -> Option<NegationKind> {
    let lower = token.text.to_lowercase();
    if lexicon!("never", "nothing", "nobody", "none", "nowhere", "neither", "nor", "noone").contains(lower.as_str()) {
        return Some(NegationKind::Absolute);
    }
    if lower.ends_with("n't") || lower == "cannot" {
        return Some(NegationKind::Contraction);
    }
    if lower == "not" || lower == "no" || table.words.contains(&lower) {
        return Some(NegationKind::Simple);
    }
    None
}

fn resolve(text: &str, tokens: &[Token], sentences: &[SentenceSpan], cand: Candidate) -> Option<NegationOccurrence> {
    let sentence = sentences.get(sentence_index_of(sentences, cand.range.start))?;
    // Anchor on the trigger's last token.
    let anchor = tokens.iter().rposition(|t| t.start < cand.range.end && t.end > cand.range.start)?;
    let head = find_head(tokens, sentence, &cand.range, anchor);

    Some(NegationOccurrence {
        trigger: text[cand.range.start..cand.range.end].to_string(),
        start: cand.range.start,
        end: cand.range.end,
        head,
        head_text: tokens[head].text.clone(),
        scope: scope(text, sentence, &cand.range),
        kind: cand.kind,
    })
}

/// Preference order verb > auxiliary > adjective; within a tag, right-ward
/// first, nearest first. Falls back to the next word, then to the trigger.
fn find_head(tokens: &[Token], sentence: &SentenceSpan, trigger: &Range, anchor: usize) -> usize {
    let eligible = |idx: usize| {
        let t = &tokens[idx];
        sentence.contains(t.start) && !(t.start < trigger.end && t.end > trigger.start)
    };
    let right: Vec<usize> = (anchor + 1..tokens.len().min(anchor + 1 + HEAD_WINDOW)).filter(|&i| eligible(i)).collect();
    let left: Vec<usize> = (anchor.saturating_sub(HEAD_WINDOW)..anchor).rev().filter(|&i| eligible(i)).collect();

    for pos in HEAD_PREFERENCE {
        if let Some(&idx) = right.iter().chain(left.iter()).find(|&&i| tokens[i].pos == pos) {
            return idx;
        }
    }
    right.iter().copied().find(|&i| tokens[i].is_alpha).unwrap_or(anchor)
}

fn scope(text: &str, sentence: &SentenceSpan, trigger: &Range) -> String {
    let tail_end = sentence.end.max(trigger.end);
    let tail = &text[trigger.end..tail_end];
    let window_end = tail.char_indices().nth(SCOPE_CHARS).map(|(i, _)| i).unwrap_or(tail.len());
    let window = &tail[..window_end];

    let clause_end = regex!(r"[,;.!?\u{2014}\u{2013}]| - ").find(window).map(|m| m.start()).unwrap_or(window.len());
    text[trigger.start..trigger.end + clause_end].trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContextTuning, RuleSet};
    use crate::engine::compiled::CompiledPatterns;
    use crate::text::{segment_sentences, tokenize};

    fn run(text: &str) -> NegationAnalysis {
        run_with(text, &RuleSet::default())
    }

    fn run_with(text: &str, rules: &RuleSet) -> NegationAnalysis {
        let compiled = CompiledPatterns::compile(rules, &ContextTuning::default());
        let tokens = tokenize(text);
        let sentences = segment_sentences(text);
        detect(text, &tokens, &sentences, &compiled.negation)
    }

    #[test]
    fn idiom_wins_over_inner_single_token() {
        let res = run("I never said that, not at all!");
        let triggers: Vec<(&str, NegationKind)> = res.occurrences.iter().map(|o| (o.trigger.as_str(), o.kind)).collect();
        assert_eq!(triggers, vec![("never", NegationKind::Absolute), ("not at all", NegationKind::MultiToken)]);
        assert_eq!(res.occurrences[0].head_text, "said");
        assert_eq!(res.occurrences[0].scope, "never said that");
        assert_eq!(res.occurrences[1].head_text, "said");
    }

    #[test]
    fn contractions_prefer_the_following_verb() {
        let res = run("I don't care anymore.");
        let occ = &res.occurrences[0];
        assert_eq!(occ.kind, NegationKind::Contraction);
        assert_eq!(occ.head_text, "care");
        assert_eq!(occ.scope, "don't care anymore");
    }

    #[test]
    fn adjective_heads_when_no_verb_in_window() {
        let res = run("That is not fair");
        // "is" is an auxiliary to the left; auxiliary outranks adjective.
        assert_eq!(res.occurrences[0].head_text, "is");
        let res = run("Not fair, honestly");
        assert_eq!(res.occurrences[0].head_text, "fair");
        assert_eq!(res.occurrences[0].scope, "Not fair");
    }

    #[test]
    fn scope_stays_inside_the_sentence() {
        let text = "You are not listening. Stop it";
        let res = run(text);
        assert_eq!(res.occurrences[0].scope, "not listening");
        let spans = segment_sentences(text);
        for occ in &res.occurrences {
            let span = spans[sentence_index_of(&spans, occ.start)];
            assert!(occ.start + occ.scope.len() <= span.end);
        }
    }

    #[test]
    fn complex_and_configured_negators() {
        let mut rules = RuleSet::default();
        rules.negation.words.push("nah".into());
        rules.negation.patterns.push(r"/(?i)\bno chance\b/".into());
        let res = run_with("I hardly slept, nah. No chance today", &rules);
        let kinds: Vec<NegationKind> = res.occurrences.iter().map(|o| o.kind).collect();
        assert_eq!(kinds, vec![NegationKind::ComplexPattern, NegationKind::Simple, NegationKind::ComplexPattern]);
    }

    #[test]
    fn no_negation() {
        let res = run("I love you so much!");
        assert!(!res.present);
        assert_eq!(res.count(), 0);
    }
}
