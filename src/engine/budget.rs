//! Budget controller.
//!
//! Three ceilings, three behaviours:
//!
//! - characters: a hard clamp applied during normalization;
//! - tokens: a hard gate, checked once right after tokenization. Over the
//!   limit the expensive detectors (sarcasm, intensity) are skipped and report
//!   their neutral defaults;
//! - milliseconds: advisory. An overrun is logged and recorded, never aborted.

use crate::config::BudgetConfig;
use std::time::Duration;

/// Outcome of the token gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    Proceed,
    SkipExpensive,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget {
    config: BudgetConfig,
}

impl Budget {
    pub(crate) fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    pub(crate) fn max_chars(&self) -> usize {
        self.config.max_chars
    }

    pub(crate) fn max_millis(&self) -> u64 {
        self.config.max_millis
    }

    pub(crate) fn gate(&self, token_count: usize) -> Gate {
        if token_count > self.config.max_tokens {
            tracing::debug!(
                token_count,
                max_tokens = self.config.max_tokens,
                "token budget exceeded; skipping sarcasm and intensity"
            );
            Gate::SkipExpensive
        } else {
            Gate::Proceed
        }
    }

    /// Log (only) when `elapsed` is past the millisecond budget. Returns whether it was.
    pub(crate) fn check_time(&self, elapsed: Duration) -> bool {
        let over = elapsed > Duration::from_millis(self.config.max_millis);
        if over {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.config.max_millis,
                "analysis exceeded its time budget"
            );
        }
        over
    }
}
