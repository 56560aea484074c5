use crate::error::Result;
use crate::orchestrator::{Admission, GoalHandle, GoalId, GoalSnapshot, Orchestrator};
use crate::registry::MotionRegistry;
use crate::sync::{read, write};
use crate::types::{GoalResult, MotionInfo};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{error, info};

/// Request handlers reachable while the service is active: the registry
/// operations and the goal protocol.
#[derive(Clone)]
pub struct Endpoints {
    registry: Arc<RwLock<MotionRegistry>>,
    orchestrator: Arc<Orchestrator>,
}

impl Endpoints {
    pub fn new(registry: Arc<RwLock<MotionRegistry>>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            registry,
            orchestrator,
        }
    }

    // -- registry -----------------------------------------------------------

    pub fn list_motions(&self) -> Vec<String> {
        read(&self.registry).keys().to_vec()
    }

    pub fn get_motion_info(&self, key: &str) -> Result<MotionInfo> {
        read(&self.registry).get(key).cloned().inspect_err(|e| {
            error!("{e}");
        })
    }

    pub fn is_motion_ready(&self, key: &str) -> bool {
        self.orchestrator.is_motion_ready(key)
    }

    pub fn add_motion(&self, motion: MotionInfo, overwrite: bool) -> Result<()> {
        let key = motion.key.clone();
        match write(&self.registry).add(motion, overwrite) {
            Ok(()) => {
                info!(motion = %key, overwrite, "motion added");
                Ok(())
            }
            Err(e) => {
                error!(motion = %key, "{e}");
                Err(e)
            }
        }
    }

    pub fn remove_motion(&self, key: &str) -> Result<()> {
        match write(&self.registry).remove(key) {
            Ok(_) => {
                info!(motion = %key, "motion removed");
                Ok(())
            }
            Err(e) => {
                error!(motion = %key, "{e}");
                Err(e)
            }
        }
    }

    // -- goals --------------------------------------------------------------

    pub fn submit(&self, motion_name: &str, skip_planning: bool) -> Admission {
        self.orchestrator.submit(motion_name, skip_planning)
    }

    pub fn cancel(&self, goal_id: GoalId) -> Result<()> {
        self.orchestrator.cancel(goal_id)
    }

    pub fn goal(&self, goal_id: GoalId) -> Result<Arc<GoalHandle>> {
        self.orchestrator.goal(goal_id)
    }

    pub fn goals(&self) -> Vec<GoalSnapshot> {
        self.orchestrator.goals()
    }

    pub fn wait(&self, goal_id: GoalId, timeout: Option<Duration>) -> Result<Option<GoalResult>> {
        self.orchestrator.wait(goal_id, timeout)
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }

    /// Cancel and drain the in-flight goal, if any.
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
    }
}
