//! Lexical feature detectors.
//!
//! Each detector consumes the normalized text, its tokens/sentences and the
//! matcher tables from `engine::compiled`, and returns an immutable analysis.
//! Detectors never fail: nothing matched means an empty (default) analysis.
//!
//! ```text
//! negation      ─ trigger words, idioms, complex patterns ─▶ head + clause scope
//! sarcasm       ─ built-in + configured patterns          ─▶ affine probability
//! intensity     ─ adverbs + configured modifiers          ─▶ bounded product
//! entities      ─ PERSON / DATE / ORG / MONEY regex families
//! phrase_edges  ─ configured edge phrases
//! dependencies  ─ shallow neg / advmod / nsubj / amod edges
//! ```

#[path = "detect/dependencies.rs"]
pub(crate) mod dependencies;
#[path = "detect/entities.rs"]
pub(crate) mod entities;
#[path = "detect/intensity.rs"]
pub(crate) mod intensity;
#[path = "detect/negation.rs"]
pub(crate) mod negation;
#[path = "detect/phrase_edges.rs"]
pub(crate) mod phrase_edges;
#[path = "detect/sarcasm.rs"]
pub(crate) mod sarcasm;
