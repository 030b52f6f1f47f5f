//! Classifiers.
//!
//! - `context`: per-sentence weighted scoring of the configured contexts, with
//!   cooldowns, decay, boosts, bucket effects and softmax confidences.
//! - `guards`: the ordered bucket-guard pipeline used by `context`.
//! - `taxonomy`: P-code rule scores, optional zero-shot scores, threshold + rank.
//! - `zero_shot`: the external provider seam.

#[path = "classify/context.rs"]
pub(crate) mod context;
#[path = "classify/guards.rs"]
mod guards;
#[path = "classify/taxonomy.rs"]
pub(crate) mod taxonomy;
#[path = "classify/zero_shot.rs"]
pub(crate) mod zero_shot;
