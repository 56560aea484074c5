use axum::extract::{Path, State};
use axum::Json;
use playmotion_core::lifecycle::Transition;

use crate::error::AppError;
use crate::state::{AppState, SseMessage};

/// GET /api/lifecycle: current state and the transitions available from it.
pub async fn get_lifecycle(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let state = app.service.state();
    Ok(Json(serde_json::json!({
        "state": state,
        "available_transitions": state.available_transitions(),
    })))
}

/// POST /api/lifecycle/:transition: run a lifecycle transition.
pub async fn run_transition(
    State(app): State<AppState>,
    Path(transition): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let transition: Transition = transition.parse()?;
    let service = app.service.clone();
    let (outcome, state) = tokio::task::spawn_blocking(move || {
        let outcome = service.transition(transition)?;
        Ok::<_, playmotion_core::MotionError>((outcome, service.state()))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let _ = app.event_tx.send(SseMessage::Lifecycle { state });
    Ok(Json(serde_json::json!({ "state": state, "outcome": outcome })))
}
