use axum::extract::{Path, State};
use axum::Json;
use playmotion_core::types::MotionInfo;
use serde::Deserialize;

use super::with_endpoints;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/motions: every motion key.
pub async fn list_motions(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let keys = with_endpoints(&app, |ep| Ok(ep.list_motions())).await?;
    Ok(Json(serde_json::json!({ "motion_keys": keys })))
}

/// GET /api/motions/:key: full motion definition.
pub async fn get_motion(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let motion = with_endpoints(&app, move |ep| ep.get_motion_info(&key)).await?;
    Ok(Json(serde_json::json!({ "motion": motion })))
}

/// GET /api/motions/:key/ready: whether a goal for the motion would be admitted now.
pub async fn motion_ready(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let is_ready = with_endpoints(&app, move |ep| Ok(ep.is_motion_ready(&key))).await?;
    Ok(Json(serde_json::json!({ "is_ready": is_ready })))
}

#[derive(Deserialize)]
pub struct AddMotionBody {
    pub motion: MotionInfo,
    #[serde(default)]
    pub overwrite: bool,
}

/// POST /api/motions: add a motion, replacing an existing key only with `overwrite`.
pub async fn add_motion(
    State(app): State<AppState>,
    Json(body): Json<AddMotionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    with_endpoints(&app, move |ep| ep.add_motion(body.motion, body.overwrite)).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /api/motions/:key
pub async fn remove_motion(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    with_endpoints(&app, move |ep| ep.remove_motion(&key)).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
