use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
};
use mongodb::bson;
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    /// Text safe to hand back to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Decode(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                warn!(message = %msg, "Request rejected");
            }
            AppError::Database(e) => error!(error = ?e, "Database error"),
            AppError::Decode(e) => error!(error = ?e, "Document decode error"),
            AppError::Internal(msg) => error!(message = %msg, "Internal error"),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        ApiResponse::failure(self.public_message()).into_response()
    }
}
