//! Shallow dependency edges.
//!
//! Four relations, each produced by a fixed positional rule inside one
//! sentence:
//!
//! - `neg`: negation head ← trigger (from the negation analysis);
//! - `advmod`: nearest verb/adjective/adverb ← adverb, right-ward first, within 3 tokens;
//! - `nsubj`: verb ← the closest pronoun/noun to its left, skipping auxiliaries and adverbs;
//! - `amod`: noun ← directly preceding adjective.

use crate::detect::negation::NegationAnalysis;
use crate::text::sentence_index_of;
use crate::{PosTag, SentenceSpan, Token};
use serde::{Deserialize, Serialize};

const ADVMOD_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyRelation {
    Neg,
    Advmod,
    Nsubj,
    Amod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub relation: DependencyRelation,
    /// Token index of the governor.
    pub head: usize,
    /// Token index of the dependent.
    pub dependent: usize,
}

pub(crate) fn extract(tokens: &[Token], sentences: &[SentenceSpan], negation: &NegationAnalysis) -> Vec<DependencyEdge> {
    let sentence_of = |t: &Token| sentence_index_of(sentences, t.start);
    let same_sentence = |a: usize, b: usize| sentence_of(&tokens[a]) == sentence_of(&tokens[b]);
    let mut edges = Vec::new();

    let mut negators = Vec::new();
    for occ in &negation.occurrences {
        if let Some(dep) = tokens.iter().position(|t| t.start >= occ.start && t.start < occ.end) {
            negators.push(dep);
            if dep != occ.head {
                edges.push(DependencyEdge { relation: DependencyRelation::Neg, head: occ.head, dependent: dep });
            }
        }
    }

    for (i, tok) in tokens.iter().enumerate() {
        match tok.pos {
            PosTag::Adv if !negators.contains(&i) => {
                let right = (i + 1..tokens.len().min(i + 1 + ADVMOD_WINDOW)).find(|&j| is_modifiable(&tokens[j]));
                let left = (i.saturating_sub(ADVMOD_WINDOW)..i).rev().find(|&j| is_modifiable(&tokens[j]));
                if let Some(head) = right.or(left).filter(|&j| same_sentence(i, j)) {
                    edges.push(DependencyEdge { relation: DependencyRelation::Advmod, head, dependent: i });
                }
            }
            PosTag::Verb => {
                let subject = tokens[..i]
                    .iter()
                    .rev()
                    .take_while(|t| same_sentence(t.index, i))
                    .find(|t| !matches!(t.pos, PosTag::Aux | PosTag::Adv) && !negators.contains(&t.index))
                    .filter(|t| matches!(t.pos, PosTag::Pron | PosTag::Noun | PosTag::Propn));
                if let Some(subject) = subject {
                    edges.push(DependencyEdge { relation: DependencyRelation::Nsubj, head: i, dependent: subject.index });
                }
            }
            PosTag::Adj => {
                if let Some(next) = tokens.get(i + 1) {
                    if matches!(next.pos, PosTag::Noun | PosTag::Propn) && same_sentence(i, i + 1) {
                        edges.push(DependencyEdge { relation: DependencyRelation::Amod, head: i + 1, dependent: i });
                    }
                }
            }
            _ => {}
        }
    }

    edges.sort_by_key(|e| (e.dependent, e.head, e.relation));
    edges
}

fn is_modifiable(tok: &Token) -> bool {
    matches!(tok.pos, PosTag::Verb | PosTag::Adj | PosTag::Adv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContextTuning, RuleSet};
    use crate::detect::negation;
    use crate::engine::compiled::CompiledPatterns;
    use crate::text::{segment_sentences, tokenize};

    fn run(text: &str) -> (Vec<Token>, Vec<DependencyEdge>) {
        let compiled = CompiledPatterns::compile(&RuleSet::default(), &ContextTuning::default());
        let tokens = tokenize(text);
        let sentences = segment_sentences(text);
        let neg = negation::detect(text, &tokens, &sentences, &compiled.negation);
        let edges = extract(&tokens, &sentences, &neg);
        (tokens, edges)
    }

    fn rel(edges: &[DependencyEdge], relation: DependencyRelation) -> Vec<(usize, usize)> {
        edges.iter().filter(|e| e.relation == relation).map(|e| (e.head, e.dependent)).collect()
    }

    #[test]
    fn negated_verb_with_subject() {
        // I(0) don't(1) care(2)
        let (_, edges) = run("I don't care");
        assert_eq!(rel(&edges, DependencyRelation::Neg), vec![(2, 1)]);
        assert_eq!(rel(&edges, DependencyRelation::Nsubj), vec![(2, 0)]);
    }

    #[test]
    fn adverbs_and_adjectives_attach() {
        // She(0) quickly(1) made(2) a(3) terrible(4) mess(5)
        let (tokens, edges) = run("She quickly made a terrible mess");
        assert_eq!(tokens[5].pos, PosTag::Noun);
        assert_eq!(rel(&edges, DependencyRelation::Advmod), vec![(2, 1)]);
        assert_eq!(rel(&edges, DependencyRelation::Amod), vec![(5, 4)]);
        assert_eq!(rel(&edges, DependencyRelation::Nsubj), vec![(2, 0)]);
    }

    #[test]
    fn edges_do_not_cross_sentences() {
        // Stop(0) .(1) Really(2)
        let (_, edges) = run("Stop. Really");
        assert!(edges.is_empty());
    }
}
