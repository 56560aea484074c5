use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use playmotion_core::error::MotionError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit status codes
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 404 through the `anyhow::Error` chain.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }

    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<NotFoundError>().is_some() {
            return StatusCode::NOT_FOUND;
        }

        match self.0.downcast_ref::<MotionError>() {
            Some(e) => match e {
                MotionError::MotionNotFound(_) | MotionError::GoalNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                MotionError::MotionExists(_) => StatusCode::CONFLICT,
                MotionError::EmptyMotionKey
                | MotionError::InvalidMotion { .. }
                | MotionError::UnknownTransition(_)
                | MotionError::NoMotions
                | MotionError::Config(_) => StatusCode::BAD_REQUEST,
                MotionError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                MotionError::NotActive(_) => StatusCode::SERVICE_UNAVAILABLE,
                MotionError::Engine(_)
                | MotionError::Io(_)
                | MotionError::Yaml(_)
                | MotionError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmotion_core::lifecycle::{LifecycleState, Transition};

    fn status_of(err: MotionError) -> StatusCode {
        AppError(err.into()).into_response().status()
    }

    #[test]
    fn motion_not_found_maps_to_404() {
        assert_eq!(
            status_of(MotionError::MotionNotFound("wave".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn goal_not_found_maps_to_404() {
        assert_eq!(
            status_of(MotionError::GoalNotFound("abc".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn motion_exists_maps_to_409() {
        assert_eq!(
            status_of(MotionError::MotionExists("home".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn invalid_motion_maps_to_400() {
        let err = MotionError::InvalidMotion {
            key: "bad".into(),
            reason: "empty 'joints'".into(),
        };
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(MotionError::EmptyMotionKey), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_transition_maps_to_422() {
        let err = MotionError::InvalidTransition {
            from: LifecycleState::Unconfigured,
            transition: Transition::Activate,
        };
        assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn not_active_maps_to_503() {
        assert_eq!(
            status_of(MotionError::NotActive(LifecycleState::Inactive)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn io_error_maps_to_500() {
        let io_err = std::io::Error::other("disk full");
        assert_eq!(
            status_of(MotionError::Io(io_err)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn non_motion_error_maps_to_500() {
        let response = AppError(anyhow::anyhow!("something unexpected")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_sentinel_maps_to_404() {
        assert_eq!(
            AppError::not_found("no goal").into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError(MotionError::MotionNotFound("wave".into()).into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
