use crate::types::{ExecutionOutcome, MotionInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Cooperative cancellation signal shared between the orchestrator and the
/// engine running a goal. The engine polls it at its own safe checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// ExecutionEngine
// ---------------------------------------------------------------------------

/// Drives motions on the robot.
///
/// `execute` blocks the calling thread until the motion reaches a terminal
/// outcome. Implementations must return [`ExecutionOutcome::Canceled`] soon
/// after `cancel` is signaled, unless the motion already finished.
pub trait ExecutionEngine: Send + Sync {
    /// Whether `motion` can currently be executed, e.g. every joint is
    /// claimed by an active controller and planning is available when
    /// `skip_planning` is false.
    fn is_executable(&self, motion: &MotionInfo, skip_planning: bool) -> bool;

    fn execute(
        &self,
        motion: &MotionInfo,
        skip_planning: bool,
        cancel: &CancelToken,
    ) -> ExecutionOutcome;
}
