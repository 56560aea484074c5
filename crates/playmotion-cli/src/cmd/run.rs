use crate::output::print_json;
use anyhow::{bail, Result};
use playmotion_cli::MotionClient;
use std::time::Duration;
use uuid::Uuid;

/// Run a motion and wait for it. Anything short of success is an error so
/// the process exits non-zero.
pub fn run(
    client: &MotionClient,
    motion: &str,
    skip_planning: bool,
    timeout: Duration,
    json: bool,
) -> Result<()> {
    let result = client.execute(motion, skip_planning, timeout)?;

    if json {
        print_json(&result)?;
    } else if result.success {
        println!("Motion '{motion}' {}", result.status);
    }

    if !result.success {
        if result.error.is_empty() {
            bail!("motion '{motion}' {}", result.status);
        }
        bail!("motion '{motion}' {}: {}", result.status, result.error);
    }
    Ok(())
}

/// Submit a motion without waiting and print its goal id.
pub fn submit(client: &MotionClient, motion: &str, skip_planning: bool, json: bool) -> Result<()> {
    let goal_id = client.submit(motion, skip_planning)?;
    if json {
        print_json(&serde_json::json!({ "goal_id": goal_id, "status": "accepted" }))
    } else {
        println!("{goal_id}");
        Ok(())
    }
}

pub fn cancel(client: &MotionClient, goal_id: Uuid, json: bool) -> Result<()> {
    client.cancel(goal_id)?;
    if json {
        print_json(&serde_json::json!({ "goal_id": goal_id, "accepted": true }))
    } else {
        println!("Cancel requested for {goal_id}");
        Ok(())
    }
}
