use crate::output::{print_fields, print_json};
use anyhow::{bail, Result};
use playmotion_cli::MotionClient;
use playmotion_core::lifecycle::{Transition, TransitionOutcome};

/// Show the service state, or run `transition` when given.
pub fn run(client: &MotionClient, transition: Option<&str>, json: bool) -> Result<()> {
    let Some(transition) = transition else {
        return show(client, json);
    };

    let transition: Transition = transition.parse()?;
    let reply = client.transition(transition)?;

    if json {
        print_json(&reply)?;
    } else {
        println!("{transition}: {} (now {})", reply.outcome, reply.state);
    }
    if reply.outcome != TransitionOutcome::Success {
        bail!("{transition} returned {}", reply.outcome);
    }
    Ok(())
}

fn show(client: &MotionClient, json: bool) -> Result<()> {
    let view = client.lifecycle()?;
    if json {
        return print_json(&view);
    }

    let available: Vec<&str> = view
        .available_transitions
        .iter()
        .map(|t| t.as_str())
        .collect();
    print_fields(&[
        ("state", view.state.to_string()),
        ("transitions", available.join(", ")),
    ]);
    Ok(())
}
