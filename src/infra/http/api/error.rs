use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{ErrorReport, HandlerError};
use crate::application::repos::RepoError;
use crate::application::storage::StorageError;
use crate::domain::validation::ValidationErrors;

const SOURCE: &str = "infra::http::api";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const VALIDATION: &str = "validation_failed";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const INVALID_TOKEN: &str = "invalid_token";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_CURSOR: &str = "invalid_cursor";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const STORAGE: &str = "storage_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    fields: Option<ValidationErrors>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint: None,
            fields: None,
            report: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn with_report(mut self, error: &dyn std::error::Error) -> Self {
        self.report = Some(ErrorReport::from_error(SOURCE, self.status, error));
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "authentication required",
        )
    }

    pub fn invalid_token(err: &dyn std::error::Error) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::INVALID_TOKEN,
            "bearer token is invalid",
        )
        .with_hint(err.to_string())
        .with_report(err)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        let mut error = Self::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            "request failed validation",
        )
        .with_hint(errors.to_string());
        error.fields = Some(errors);
        error
    }
}

impl From<HandlerError> for ApiError {
    fn from(err: HandlerError) -> Self {
        let mapped = match &err {
            HandlerError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, err.to_string())
            }
            HandlerError::Forbidden { .. } => {
                Self::new(StatusCode::FORBIDDEN, codes::FORBIDDEN, err.to_string())
            }
            HandlerError::Unauthorized => Self::unauthorized(),
            HandlerError::Validation(errors) => Self::validation(errors.clone()),
            HandlerError::Conflict { message } => {
                Self::new(StatusCode::CONFLICT, codes::CONFLICT, *message)
            }
            HandlerError::Pagination(inner) => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_CURSOR,
                "invalid cursor",
            )
            .with_hint(inner.to_string()),
            HandlerError::Storage(inner) => storage_error(inner),
            HandlerError::Repo(inner) => repo_error(inner),
        };
        mapped.with_report(&err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

fn repo_error(err: &RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => {
            ApiError::new(StatusCode::CONFLICT, codes::DUPLICATE, "duplicate record")
                .with_hint(constraint.clone())
        }
        RepoError::Pagination(inner) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_CURSOR,
            "invalid cursor",
        )
        .with_hint(inner.to_string()),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => {
            ApiError::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, "invalid input")
                .with_hint(message.clone())
        }
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "integrity constraint violated",
        )
        .with_hint(message.clone()),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "database timeout",
        ),
        RepoError::Persistence(_) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "persistence error",
        ),
    }
}

fn storage_error(err: &StorageError) -> ApiError {
    match err {
        StorageError::NotFound => ApiError::not_found("object not found"),
        StorageError::InvalidKey => ApiError::bad_request("invalid object key"),
        StorageError::TooLarge { limit } => ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            "payload too large",
        )
        .with_hint(format!("limit is {limit} bytes")),
        StorageError::EmptyPayload => ApiError::bad_request("payload is empty"),
        StorageError::PayloadStream { .. } => ApiError::bad_request("request body was interrupted"),
        StorageError::Io(_) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::STORAGE,
            "storage error",
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                SOURCE,
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(&self.message)
                ),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
                fields: self.fields,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
