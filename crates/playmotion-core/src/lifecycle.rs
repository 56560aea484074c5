use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MotionError;

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// Managed lifecycle state of the motion service. Endpoints are reachable
/// only while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Unconfigured,
    Inactive,
    Active,
    Finalized,
    ErrorProcessing,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Unconfigured => "unconfigured",
            LifecycleState::Inactive => "inactive",
            LifecycleState::Active => "active",
            LifecycleState::Finalized => "finalized",
            LifecycleState::ErrorProcessing => "error_processing",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Finalized)
    }

    /// Transitions a caller may request from this state.
    pub fn available_transitions(self) -> Vec<Transition> {
        Transition::all()
            .iter()
            .copied()
            .filter(|t| t.target(self).is_some())
            .collect()
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Caller-requested lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Configure,
    Activate,
    Deactivate,
    Cleanup,
    Shutdown,
}

impl Transition {
    pub fn all() -> &'static [Transition] {
        &[
            Transition::Configure,
            Transition::Activate,
            Transition::Deactivate,
            Transition::Cleanup,
            Transition::Shutdown,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Configure => "configure",
            Transition::Activate => "activate",
            Transition::Deactivate => "deactivate",
            Transition::Cleanup => "cleanup",
            Transition::Shutdown => "shutdown",
        }
    }

    /// State reached when the transition callback succeeds from `from`, or
    /// `None` when the transition is not allowed there.
    pub fn target(self, from: LifecycleState) -> Option<LifecycleState> {
        use LifecycleState::*;
        match (self, from) {
            (Transition::Configure, Unconfigured) => Some(Inactive),
            (Transition::Activate, Inactive) => Some(Active),
            (Transition::Deactivate, Active) => Some(Inactive),
            (Transition::Cleanup, Inactive) => Some(Unconfigured),
            (Transition::Shutdown, Unconfigured | Inactive | Active) => Some(Finalized),
            _ => None,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Transition {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "configure" => Ok(Transition::Configure),
            "activate" => Ok(Transition::Activate),
            "deactivate" => Ok(Transition::Deactivate),
            "cleanup" => Ok(Transition::Cleanup),
            "shutdown" => Ok(Transition::Shutdown),
            _ => Err(MotionError::UnknownTransition(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TransitionOutcome
// ---------------------------------------------------------------------------

/// Result of a transition callback.
///
/// `Failure` leaves the service in the state it started from; `Error` sends
/// it through `ErrorProcessing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    Success,
    Failure,
    Error,
}

impl TransitionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionOutcome::Success => "success",
            TransitionOutcome::Failure => "failure",
            TransitionOutcome::Error => "error",
        }
    }
}

impl fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State following a callback that ran `transition` from `from`.
pub fn resolve(
    from: LifecycleState,
    transition: Transition,
    outcome: TransitionOutcome,
) -> LifecycleState {
    match outcome {
        TransitionOutcome::Success => transition.target(from).unwrap_or(from),
        TransitionOutcome::Failure => from,
        TransitionOutcome::Error => LifecycleState::ErrorProcessing,
    }
}
