//! The five extraction stages.
//!
//! Each stage consumes the previous stage's remaining title and produces its
//! own remaining title plus an extracted artifact. Stages never backtrack,
//! never perform I/O, and never share mutable state; long-running stages
//! check a cooperative [`CancelToken`] at well-defined points.

pub mod classifier;
pub mod dates;
pub mod geography;
pub mod report_type;
pub mod topic;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation for per-title work.
///
/// Carries an optional wall-clock budget plus a manual cancel flag. Stages
/// poll `expired()` at checkpoints (stage start, after keyword detection in
/// the report-type stage, after each pattern pass in the geographic stage);
/// nothing is pre-empted mid-scan.
#[derive(Debug, Clone)]
pub struct CancelToken {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that never expires on its own.
    pub fn unbounded() -> Self {
        CancelToken {
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A token that expires after the given processing budget.
    pub fn with_budget(budget: Duration) -> Self {
        CancelToken {
            deadline: Some(Instant::now() + budget),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation from outside the worker.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the budget has elapsed or cancellation was requested.
    pub fn expired(&self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
