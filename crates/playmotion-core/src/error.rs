use thiserror::Error;

use crate::lifecycle::{LifecycleState, Transition};

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("motion '{0}' does not exist")]
    MotionNotFound(String),

    #[error("motion '{0}' already exists and overwrite option is disabled")]
    MotionExists(String),

    #[error("motion key is empty")]
    EmptyMotionKey,

    #[error("motion '{key}' is not valid: {reason}")]
    InvalidMotion { key: String, reason: String },

    #[error("no valid motions defined in configuration file")]
    NoMotions,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("engine construction failed: {0}")]
    Engine(String),

    #[error("cannot {transition} from state {from}")]
    InvalidTransition {
        from: LifecycleState,
        transition: Transition,
    },

    #[error("unknown lifecycle transition: {0}")]
    UnknownTransition(String),

    #[error("service is not active (current state: {0})")]
    NotActive(LifecycleState),

    #[error("goal not found: {0}")]
    GoalNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MotionError>;
