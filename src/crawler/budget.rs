//! Execution budget governor
//!
//! Tracks elapsed wall-clock time against a hard deadline. Traversal checks it
//! before dispatching work and bounds every wait on children by it; sync
//! checks it before starting each file.

use crate::config::BudgetConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline shared by every task of one invocation
#[derive(Debug, Clone, Copy)]
pub struct BudgetGovernor {
    started: Instant,
    deadline: Instant,
}

impl BudgetGovernor {
    /// Starts the clock; work stops `max_execution - safety_margin` from now
    pub fn new(max_execution: Duration, safety_margin: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + max_execution.saturating_sub(safety_margin),
        }
    }

    pub fn from_config(config: &BudgetConfig) -> Self {
        Self::new(config.max_execution(), config.safety_margin())
    }

    /// A governor whose budget is effectively unlimited
    pub fn unlimited() -> Self {
        // About thirty years; far enough to never trip, near enough to not overflow
        Self::new(Duration::from_secs(86_400 * 365 * 30), Duration::ZERO)
    }

    /// Returns true while there is time left to start new work
    pub fn has_budget(&self) -> bool {
        Instant::now() < self.deadline
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
