use anyhow::{bail, Context, Result};
use playmotion_core::config::{Config, WarnLevel};
use playmotion_core::lifecycle::{Transition, TransitionOutcome};
use playmotion_core::service::{ConfigSource, MotionService};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

pub fn run(motions: &Path, port: u16, activate: bool) -> Result<()> {
    // Parse once up front so a bad file fails here instead of at `configure`.
    let config = Config::load(motions)
        .with_context(|| format!("cannot load motion file {}", motions.display()))?;
    for warning in config.validate() {
        match warning.level {
            WarnLevel::Error => error!("{}", warning.message),
            WarnLevel::Warning => warn!("{}", warning.message),
        }
    }

    let service = Arc::new(MotionService::with_playback(ConfigSource::File(
        motions.to_path_buf(),
    )));

    if activate {
        for transition in [Transition::Configure, Transition::Activate] {
            let outcome = service.transition(transition)?;
            if outcome != TransitionOutcome::Success {
                bail!(
                    "{transition} returned {outcome}; service is {}",
                    service.state()
                );
            }
        }
    }

    let rt = tokio::runtime::Runtime::new()?;
    let server_service = service.clone();
    let result = rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();

        println!(
            "playmotion ({} motions, {}) on http://localhost:{actual_port}",
            config.motions.len(),
            server_service.state()
        );

        tokio::select! {
            res = playmotion_server::serve_on(server_service, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    });

    // Cancel and drain any in-flight goal before the process exits.
    if !service.state().is_terminal() {
        match service.transition(Transition::Shutdown) {
            Ok(_) => info!("service shut down"),
            Err(e) => warn!("shutdown transition failed: {e}"),
        }
    }
    result
}
