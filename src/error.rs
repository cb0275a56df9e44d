use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::HashMap;

use crate::decode::{DecodeError, DecodeFailure};
use crate::validation::ValidationErrors;

/// The error type returned by every unmarshalling and validation helper
///
/// Errors come in two tiers. [`Error::Validation`] carries field-level
/// messages meant to be shown to the end user. Every other variant is fatal:
/// the request could not be processed at all and should not be rendered as
/// field errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Invalid request type: {0}")]
    InvalidRequestType(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to read request body: {0}")]
    Body(#[from] axum::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] multer::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error body returned to clients.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_errors: Option<HashMap<String, Vec<String>>>,
}

impl Error {
    pub fn invalid_request_type(msg: impl Into<String>) -> Self {
        Self::InvalidRequestType(msg.into())
    }

    pub fn other(msg: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Other(anyhow::Error::msg(msg))
    }

    /// Whether this error carries field-level validation messages rather than
    /// a fatal condition.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errs) => Some(errs),
            _ => None,
        }
    }

    /// Split validation errors from fatal ones.
    pub fn into_validation(self) -> std::result::Result<ValidationErrors, Error> {
        match self {
            Self::Validation(errs) => Ok(errs),
            other => Err(other),
        }
    }

    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidRequestType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Json(err) if !err.is_io() => StatusCode::BAD_REQUEST,
            Self::Decode(_) | Self::Multipart(_) | Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Json(_) | Self::Io(_) | Self::Config(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a message suitable for clients.
    ///
    /// Client errors (4xx) expose their message. Server errors (5xx) get a
    /// generic message; the details only go to the server logs.
    fn safe_message(&self) -> String {
        match self {
            Self::Validation(_) => "Validation failed".to_string(),
            _ if self.status_code().is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Convert the error into a response.
    ///
    /// With `dev_mode` set, server errors include their full message.
    pub fn into_response_with_mode(self, dev_mode: bool) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        let error = if dev_mode && !self.is_validation() {
            self.to_string()
        } else {
            self.safe_message()
        };

        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request failed"
            );
        } else {
            tracing::debug!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request rejected"
            );
        }

        let field_errors = match self {
            Self::Validation(errs) => Some(errs.into_inner()),
            _ => None,
        };

        let body = ErrorResponse {
            error,
            error_id,
            field_errors,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_response_with_mode(false)
    }
}

impl From<ValidationErrors> for Error {
    fn from(errs: ValidationErrors) -> Self {
        Self::Validation(errs)
    }
}

impl From<DecodeFailure> for Error {
    /// Field-shaped failures become [`Error::Validation`], anything else
    /// stays fatal.
    fn from(failure: DecodeFailure) -> Self {
        match failure.into_validation() {
            Ok(errs) => Self::Validation(errs),
            Err(err) => Self::Decode(err),
        }
    }
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
