pub mod events;
pub mod goals;
pub mod lifecycle;
pub mod motions;

use playmotion_core::handlers::Endpoints;

use crate::error::AppError;
use crate::state::AppState;

/// Run `f` against the active endpoints on the blocking pool. Fails with
/// 503 when the service is not active.
pub(crate) async fn with_endpoints<T, F>(app: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(Endpoints) -> playmotion_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = app.service.clone();
    let result = tokio::task::spawn_blocking(move || f(service.endpoints()?))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;
    Ok(result?)
}
