use alma_persist::PersistError;
use alma_session::SessionError;
use alma_tools::SandboxError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("Internal server error")]
    Internal,
}

fn persist_status(e: &PersistError) -> (StatusCode, String) {
    if e.is_not_found() {
        (StatusCode::NOT_FOUND, e.to_string())
    } else {
        tracing::error!("Persistence error: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Persist(ref e) => persist_status(e),
            ApiError::Session(ref e) => match e {
                SessionError::ThreadNotFound(_) | SessionError::ProviderNotFound(_) => {
                    (StatusCode::NOT_FOUND, e.to_string())
                }
                SessionError::InvalidModelRef(_) | SessionError::ProviderDisabled(_) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                SessionError::ThreadBusy(_) => (StatusCode::CONFLICT, e.to_string()),
                SessionError::Persist(inner) => persist_status(inner),
                SessionError::Model(_) => {
                    tracing::error!("Session error: {}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Processing error".to_string())
                }
            },
            ApiError::Sandbox(ref e) => match e {
                SandboxError::NoActiveWorkspace => (StatusCode::CONFLICT, e.to_string()),
                _ => (StatusCode::BAD_REQUEST, e.to_string()),
            },
            ApiError::Internal => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_session_errors_map_to_status() {
        assert_eq!(status(SessionError::ThreadNotFound("t".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(status(SessionError::InvalidModelRef("x".into()).into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(SessionError::ThreadBusy("t".into()).into()), StatusCode::CONFLICT);
        assert_eq!(
            status(SessionError::Model(anyhow::anyhow!("boom")).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_persist_not_found_is_404() {
        assert_eq!(status(PersistError::ThreadNotFound("t".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status(PersistError::Internal("disk".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
