//! Text layer: normalization, tokenization and sentence segmentation.
//!
//! ```text
//! raw ── normalize + clamp ──▶ text ──┬─ tokenize           ──▶ Vec<Token>
//!                                     └─ segment_sentences  ──▶ Vec<SentenceSpan>
//! ```
//!
//! Every later stage works on the normalized, clamped text; offsets in results
//! always refer to it.

#[path = "text/normalize.rs"]
mod normalize;
#[path = "text/sentences.rs"]
mod sentences;
#[path = "text/tokenizer.rs"]
mod tokenizer;

pub(crate) use normalize::normalize_and_clamp;
pub(crate) use sentences::{segment_sentences, sentence_index_of};
pub(crate) use tokenizer::{is_stop_word, split_words, tokenize};
