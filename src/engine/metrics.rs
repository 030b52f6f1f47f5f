//! Run timing.
//!
//! Every analysis records how long each pipeline stage took. The numbers are
//! diagnostic only; the single consumer that acts on them is the cache, which
//! refuses to reuse a result that was computed over budget.
//!
//! The wall-clock *timestamp* of a result comes from an injected [`Clock`], so
//! tests can pin it (and count how often a fresh analysis actually ran).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Source of result timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Elapsed time of one named stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: String,
    pub micros: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub total_micros: u64,
    pub stages: Vec<StageTiming>,
    /// Total stayed within the configured millisecond budget.
    pub within_budget: bool,
}

/// Lap timer for the pipeline stages.
pub(crate) struct StageClock {
    started: Instant,
    last: Instant,
    stages: Vec<StageTiming>,
}

impl StageClock {
    pub(crate) fn start() -> Self {
        let now = Instant::now();
        Self { started: now, last: now, stages: Vec::new() }
    }

    /// Close the current stage.
    pub(crate) fn lap(&mut self, stage: &str) {
        let now = Instant::now();
        self.stages.push(StageTiming { stage: stage.to_string(), micros: micros(now - self.last) });
        self.last = now;
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn finish(self, budget_millis: u64) -> Timing {
        let total = self.started.elapsed();
        Timing {
            total_micros: micros(total),
            stages: self.stages,
            within_budget: total <= Duration::from_millis(budget_millis),
        }
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}
