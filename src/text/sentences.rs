//! Sentence segmentation.
//!
//! Boundaries are runs of `.`, `!`, `?` or newlines. Each span ends after its
//! boundary run plus any following whitespace, so spans tile the text with no
//! gaps. Whitespace-only slices are folded into a neighbour instead of becoming
//! their own sentence, and an empty text still yields one (empty) span.

use crate::SentenceSpan;

pub(crate) fn segment_sentences(text: &str) -> Vec<SentenceSpan> {
    let mut cuts: Vec<usize> = Vec::new();
    for m in regex!(r"[.!?]+\s*|\n\s*").find_iter(text) {
        if is_decimal_point(text, m.start(), m.as_str()) {
            continue;
        }
        cuts.push(m.end());
    }
    if cuts.last() != Some(&text.len()) {
        cuts.push(text.len());
    }

    let mut spans: Vec<SentenceSpan> = Vec::new();
    let mut start = 0;
    for cut in cuts {
        if cut <= start {
            continue;
        }
        if text[start..cut].trim().is_empty() {
            // Whitespace-only: extend the previous span, or let the next one start here.
            if let Some(last) = spans.last_mut() {
                last.end = cut;
                start = cut;
            }
            continue;
        }
        spans.push(SentenceSpan { index: spans.len(), start, end: cut });
        start = cut;
    }

    if spans.is_empty() {
        spans.push(SentenceSpan { index: 0, start: 0, end: text.len() });
    } else if let Some(last) = spans.last_mut() {
        last.end = text.len();
    }
    spans
}

/// Index of the sentence containing byte `offset` (the last sentence for
/// offsets at or past the end).
pub(crate) fn sentence_index_of(spans: &[SentenceSpan], offset: usize) -> usize {
    spans.partition_point(|s| s.end <= offset).min(spans.len().saturating_sub(1))
}

/// "3.5" is not a boundary.
fn is_decimal_point(text: &str, at: usize, matched: &str) -> bool {
    matched == "."
        && text[..at].chars().next_back().is_some_and(|c| c.is_ascii_digit())
        && text[at + 1..].chars().next().is_some_and(|c| c.is_ascii_digit())
}
