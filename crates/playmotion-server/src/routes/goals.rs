use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use playmotion_core::orchestrator::{Admission, GoalId};
use serde::Deserialize;
use std::time::Duration;

use super::with_endpoints;
use crate::error::AppError;
use crate::state::AppState;

/// Upper bound for a single long-poll on a goal result.
const MAX_RESULT_WAIT: Duration = Duration::from_secs(30);

fn parse_goal_id(id: &str) -> Result<GoalId, AppError> {
    GoalId::parse_str(id).map_err(|_| AppError::not_found(format!("goal not found: {id}")))
}

#[derive(Deserialize)]
pub struct SubmitGoalBody {
    pub motion_name: String,
    #[serde(default)]
    pub skip_planning: bool,
}

/// POST /api/goals: submit a motion goal.
///
/// 202 with the goal id when accepted, 409 with the rejection reasons
/// otherwise.
pub async fn submit_goal(
    State(app): State<AppState>,
    Json(body): Json<SubmitGoalBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let admission = with_endpoints(&app, move |ep| {
        Ok(ep.submit(&body.motion_name, body.skip_planning))
    })
    .await?;

    Ok(match admission {
        Admission::Accepted(goal_id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "goal_id": goal_id, "status": "accepted" })),
        ),
        Admission::Rejected(reasons) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "status": "rejected", "reasons": reasons })),
        ),
    })
}

/// GET /api/goals: retained goals, oldest first.
pub async fn list_goals(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let goals = with_endpoints(&app, |ep| Ok(ep.goals())).await?;
    Ok(Json(serde_json::json!({ "goals": goals })))
}

/// GET /api/goals/:id
pub async fn get_goal(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let goal_id = parse_goal_id(&id)?;
    let snapshot = with_endpoints(&app, move |ep| Ok(ep.goal(goal_id)?.snapshot())).await?;
    Ok(Json(serde_json::json!(snapshot)))
}

#[derive(Deserialize)]
pub struct ResultQuery {
    #[serde(default)]
    pub timeout_ms: u64,
}

/// GET /api/goals/:id/result?timeout_ms=N
///
/// Waits up to `timeout_ms` (capped at 30 s) for the terminal result. 200
/// with the result, or 202 when the goal is still executing.
pub async fn goal_result(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ResultQuery>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let goal_id = parse_goal_id(&id)?;
    let timeout = Duration::from_millis(q.timeout_ms).min(MAX_RESULT_WAIT);
    let result = with_endpoints(&app, move |ep| ep.wait(goal_id, Some(timeout))).await?;

    Ok(match result {
        Some(result) => (StatusCode::OK, Json(serde_json::json!(result))),
        None => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "executing" })),
        ),
    })
}

/// POST /api/goals/:id/cancel: always accepted for a known goal.
pub async fn cancel_goal(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let goal_id = parse_goal_id(&id)?;
    with_endpoints(&app, move |ep| ep.cancel(goal_id)).await?;
    Ok(Json(serde_json::json!({ "accepted": true })))
}
