//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::ExoSeekerError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Training error: {0}")]
    Training(String),
}

impl From<ExoSeekerError> for ServerError {
    fn from(err: ExoSeekerError) -> Self {
        let message = err.to_string();
        let user_error = err.is_user_error();
        match err {
            ExoSeekerError::ModelNotFound(_) => ServerError::NotFound(message),
            ExoSeekerError::Fitting(_) => ServerError::Training(message),
            ExoSeekerError::Io(e) => ServerError::Io(e),
            _ if user_error => ServerError::BadRequest(message),
            _ => ServerError::Internal(message),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Internal(_) | ServerError::Io(_) | ServerError::Training(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::BadRequest(msg) | ServerError::NotFound(msg) => msg.clone(),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                "An internal error occurred".to_string()
            }
            ServerError::Io(e) => {
                tracing::error!(detail = %e, "IO error");
                "A file system error occurred".to_string()
            }
            ServerError::Training(msg) => {
                tracing::error!(detail = %msg, "Training error");
                msg.clone()
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
