use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{
    AuthConfig, SESSION_COOKIE, ServerConfig, app, run, run_with_listener, spawn_with_listener,
};
pub use storage::{Bucket, Storage, StorageError};

mod advance;
mod auth;
mod egress;
mod files;
mod ingress;
pub mod pdf;
mod server;
mod storage;
mod summary;

pub mod types {
    pub mod egress {
        pub use api_types::egress::{EgressNew, EgressUpdate, EgressView};
    }

    pub mod ingress {
        pub use api_types::ingress::{IngressNew, IngressUpdate, IngressView};
    }

    pub mod summary {
        pub use api_types::summary::{SummaryResponse, TransactionView, WeekPoint};
    }

    pub mod advance {
        pub use api_types::advance::{AdvanceCreated, AdvanceRejection, AdvanceRequest};
    }

    pub mod files {
        pub use api_types::files::{SignedUrl, SignedUrlRequest, Uploaded};
    }

    pub mod action {
        pub use api_types::action::ActionResult;
    }
}

pub enum ServerError {
    Engine(EngineError),
    Storage(StorageError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_) | EngineError::InvalidField(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

pub(crate) fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

fn status_for_storage_error(err: &StorageError) -> StatusCode {
    match err {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
        StorageError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_storage_error(err: StorageError) -> String {
    match err {
        StorageError::Io(io_err) => {
            tracing::error!("storage io error: {io_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Storage(err) => {
                (status_for_storage_error(&err), message_for_storage_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<StorageError> for ServerError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = ServerError::from(EngineError::InvalidField("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn storage_not_found_maps_to_404() {
        let res = ServerError::from(StorageError::NotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
