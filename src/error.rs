use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::{error, warn};

use crate::views;

/// Application error taxonomy. Everything a handler can fail with maps to
/// one of these variants and renders as an error view with the matching
/// status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("no file selected")]
    NoFileSelected,

    #[error("file type not allowed, expected .xlsx or .xls")]
    DisallowedFileType,

    #[error("failed to load model artifact: {0}")]
    ModelLoad(String),

    #[error("input does not match the model feature schema: {0}")]
    FeatureSchema(String),

    #[error("invalid value {value:?} for field {field}")]
    InputParse { field: &'static str, value: String },

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NoFileSelected => StatusCode::BAD_REQUEST,
            AppError::DisallowedFileType => StatusCode::BAD_REQUEST,
            AppError::InputParse { .. } => StatusCode::BAD_REQUEST,
            AppError::FeatureSchema(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ModelLoad(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the user. Internal failures keep their
    /// details in the logs only.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                "Something went wrong, please try again later".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        (status, Html(views::error_page(status, &self.user_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::NoFileSelected.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::DisallowedFileType.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::FeatureSchema("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::ModelLoad("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_shown_to_users() {
        let err = AppError::Internal(anyhow::anyhow!("secret detail"));
        assert!(!err.user_message().contains("secret detail"));

        let err = AppError::InputParse {
            field: "item_price",
            value: "abc".into(),
        };
        assert!(err.user_message().contains("item_price"));
    }
}
