pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use playmotion_core::service::MotionService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(service: Arc<MotionService>) -> Router {
    let app_state = state::AppState::new(service);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Lifecycle
        .route("/api/lifecycle", get(routes::lifecycle::get_lifecycle))
        .route(
            "/api/lifecycle/{transition}",
            post(routes::lifecycle::run_transition),
        )
        // Motions
        .route(
            "/api/motions",
            get(routes::motions::list_motions).post(routes::motions::add_motion),
        )
        .route(
            "/api/motions/{key}",
            get(routes::motions::get_motion).delete(routes::motions::remove_motion),
        )
        .route(
            "/api/motions/{key}/ready",
            get(routes::motions::motion_ready),
        )
        // Goals
        .route(
            "/api/goals",
            get(routes::goals::list_goals).post(routes::goals::submit_goal),
        )
        .route("/api/goals/{id}", get(routes::goals::get_goal))
        .route("/api/goals/{id}/result", get(routes::goals::goal_result))
        .route("/api/goals/{id}/cancel", post(routes::goals::cancel_goal))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the motion server on `port`.
pub async fn serve(service: Arc<MotionService>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(service, listener).await
}

/// Start the motion server on a pre-bound listener.
///
/// Lets the caller read the actual port before starting (useful when
/// `port = 0` and the OS picks a free port).
pub async fn serve_on(
    service: Arc<MotionService>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(service);

    tracing::info!("playmotion server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
