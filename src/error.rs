/*
 * Responsibility
 * - Shared AppError definition (the failure taxonomy every layer reports in)
 * - IntoResponse: one status + one error envelope per failure
 * - Converts RepoError / CacheError / ConfigError into AppError
 *
 * The request path is not known here; `middleware::error_envelope` fills it in
 * from the `FailureReport` we leave in the response extensions.
 */
use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::repos::error::RepoError;
use crate::services::cache::CacheError;

pub type FieldErrors = BTreeMap<String, String>;

pub const UNAUTHENTICATED_MESSAGE: &str = "Authentication required";
pub const FORBIDDEN_MESSAGE: &str = "Access denied";
pub const VALIDATION_MESSAGE: &str = "Validation Failed";

#[derive(Debug, Error)]
pub enum AppError {
    // Missing, malformed or expired credential. Never says which.
    #[error("authentication failed")]
    Unauthenticated,
    #[error("access denied")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("unclassified failure: {0}")]
    Unclassified(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        Self::Validation(errors)
    }

    pub fn unclassified(detail: impl ToString) -> Self {
        Self::Unclassified(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape shared by every failure response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub path: String,
    pub error_message: String,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

/// Path-less description of a failure, carried in response extensions until
/// the envelope middleware knows which request produced it.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub status: StatusCode,
    pub message: String,
    pub errors: Option<FieldErrors>,
}

impl FailureReport {
    pub fn envelope(&self, path: &str) -> ErrorEnvelope {
        ErrorEnvelope {
            path: path.to_string(),
            error_message: self.message.clone(),
            status_code: self.status.as_u16(),
            timestamp: Utc::now(),
            errors: self.errors.clone(),
        }
    }
}

impl From<AppError> for FailureReport {
    fn from(e: AppError) -> Self {
        let status = e.status();
        let (message, errors) = match e {
            AppError::Unauthenticated => (UNAUTHENTICATED_MESSAGE.to_string(), None),
            AppError::Forbidden => (FORBIDDEN_MESSAGE.to_string(), None),
            AppError::NotFound(message) => (message, None),
            AppError::Validation(errors) => (VALIDATION_MESSAGE.to_string(), Some(errors)),
            AppError::Unclassified(detail) => {
                (format!("Internal server error: {detail}"), None)
            }
        };

        FailureReport {
            status,
            message,
            errors,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Unclassified(detail) = &self {
            tracing::error!(detail = %detail, "unclassified failure");
        }

        let report = FailureReport::from(self);
        let mut res = (report.status, Json(report.envelope(""))).into_response();
        res.extensions_mut().insert(report);
        res
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => AppError::field("email", "Email is already in use"),
            RepoError::Db(_) => AppError::unclassified(e),
        }
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::unclassified(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::unclassified(e)
    }
}
