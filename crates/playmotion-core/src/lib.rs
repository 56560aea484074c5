pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod orchestrator;
pub mod playback;
pub mod registry;
pub mod service;
pub mod trajectory;
pub mod types;

mod sync;

pub use error::{MotionError, Result};
