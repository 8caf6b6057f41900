//! JSON error envelope returned by every handler.

use super::metrics;
use crate::album_store::AlbumStoreError;
use crate::classifier::ClassifierError;
use crate::pipeline::PipelineError;
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    AlbumStore(#[from] AlbumStoreError),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Pipeline(e) if e.is_bad_input() => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_)
            | ApiError::Classifier(_)
            | ApiError::AlbumStore(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) | ApiError::Rejected { .. } => "bad_request",
            ApiError::NotFound => "not_found",
            ApiError::Pipeline(e) => e.stage(),
            ApiError::Classifier(_) => "classification",
            ApiError::AlbumStore(_) => "album_store",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Rejected {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else if status != StatusCode::NOT_FOUND {
            warn!("Rejected request: {}", message);
        }
        metrics::record_error(self.error_type(), status.as_u16());

        (
            status,
            Json(ErrorBody {
                status: "error",
                message,
            }),
        )
            .into_response()
    }
}
