use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MotionError, Result};

pub type JointNames = Vec<String>;

// ---------------------------------------------------------------------------
// MotionInfo
// ---------------------------------------------------------------------------

/// A named multi-joint trajectory: one position row per entry in `times`,
/// each row ordered like `joints`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionInfo {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub description: String,
    pub joints: JointNames,
    pub positions: Vec<Vec<f64>>,
    pub times: Vec<f64>,
}

impl MotionInfo {
    /// Build a motion from the row-major flat layout used in motion files,
    /// where `positions.len() == times.len() * joints.len()`.
    pub fn from_flat(
        key: impl Into<String>,
        joints: JointNames,
        positions: &[f64],
        times: Vec<f64>,
    ) -> Result<Self> {
        let key = key.into();
        if joints.is_empty() || positions.is_empty() || times.is_empty() {
            return Err(MotionError::InvalidMotion {
                key,
                reason: "empty 'joints', 'positions' or 'times_from_start'".into(),
            });
        }
        if positions.len() != times.len() * joints.len() {
            return Err(MotionError::InvalidMotion {
                reason: format!(
                    "sizes are not compatible. 'positions' != 'joints' * 'times_from_start' \
                     ({} != {}*{})",
                    positions.len(),
                    times.len(),
                    joints.len()
                ),
                key,
            });
        }
        let positions = positions
            .chunks(joints.len())
            .map(|row| row.to_vec())
            .collect();
        let motion = Self {
            key,
            joints,
            positions,
            times,
            ..Default::default()
        };
        motion.validate()?;
        Ok(motion)
    }

    /// Check the shape invariants of a motion.
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(MotionError::EmptyMotionKey);
        }
        let invalid = |reason: String| MotionError::InvalidMotion {
            key: self.key.clone(),
            reason,
        };
        if self.joints.is_empty() || self.positions.is_empty() || self.times.is_empty() {
            return Err(invalid(
                "empty 'joints', 'positions' or 'times_from_start'".into(),
            ));
        }
        if self.positions.len() != self.times.len() {
            return Err(invalid(format!(
                "{} position rows for {} times",
                self.positions.len(),
                self.times.len()
            )));
        }
        if let Some((i, row)) = self
            .positions
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.joints.len())
        {
            return Err(invalid(format!(
                "waypoint {i} has {} positions for {} joints",
                row.len(),
                self.joints.len()
            )));
        }
        if self.times.iter().any(|t| !t.is_finite()) {
            return Err(invalid("times must be finite".into()));
        }
        if self.positions.iter().flatten().any(|p| !p.is_finite()) {
            return Err(invalid("positions must be finite".into()));
        }
        if self.times[0] < 0.0 {
            return Err(invalid("times must not be negative".into()));
        }
        if self.times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid("times must be strictly increasing".into()));
        }
        Ok(())
    }

    /// Positions of the first waypoint.
    pub fn first_waypoint(&self) -> &[f64] {
        self.positions.first().map(|p| p.as_slice()).unwrap_or(&[])
    }

    pub fn duration(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// ExecutionOutcome
// ---------------------------------------------------------------------------

/// Terminal outcome reported by an execution engine, exactly once per goal.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed(String),
    Canceled,
}

impl ExecutionOutcome {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn error(&self) -> &str {
        match self {
            Self::Failed(msg) => msg,
            Self::Succeeded | Self::Canceled => "",
        }
    }
}

// ---------------------------------------------------------------------------
// GoalStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Executing,
    Succeeded,
    Aborted,
    Canceled,
}

impl GoalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GoalStatus::Executing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Executing => "executing",
            GoalStatus::Succeeded => "succeeded",
            GoalStatus::Aborted => "aborted",
            GoalStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GoalResult
// ---------------------------------------------------------------------------

/// Terminal report of a goal as published to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalResult {
    pub status: GoalStatus,
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

impl GoalResult {
    pub fn from_outcome(outcome: &ExecutionOutcome) -> Self {
        let status = match outcome {
            ExecutionOutcome::Succeeded => GoalStatus::Succeeded,
            ExecutionOutcome::Failed(_) => GoalStatus::Aborted,
            ExecutionOutcome::Canceled => GoalStatus::Canceled,
        };
        Self {
            status,
            success: matches!(outcome, ExecutionOutcome::Succeeded),
            error: outcome.error().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RejectReason
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Busy,
    UnknownMotion,
    NotExecutable,
    /// The orchestrator was shut down by a lifecycle transition.
    Inactive,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::Busy => "busy",
            RejectReason::UnknownMotion => "unknown_motion",
            RejectReason::NotExecutable => "not_executable",
            RejectReason::Inactive => "inactive",
        })
    }
}
