use crate::application::error::ErrorReport;
use crate::application::executor::ExecutorError;
use crate::application::pagination::PaginationError;
use crate::application::repository::RepositoryError;
use crate::integrity::IntegrityError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INVALID_PAGE: &str = "invalid_page";
    pub const EXECUTOR: &str = "executor_error";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            detail: None,
        }
    }

    /// Diagnostic for the response log only; never sent to the caller.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Request digest required",
            None,
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self
            .detail
            .clone()
            .or_else(|| self.hint.clone())
            .unwrap_or_else(|| self.message.to_string());
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, detail),
        )
        .attach(&mut response);
        response
    }
}

impl From<IntegrityError> for ApiError {
    fn from(error: IntegrityError) -> Self {
        ApiError::unauthorized().with_detail(error.to_string())
    }
}

impl From<PaginationError> for ApiError {
    fn from(error: PaginationError) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_PAGE,
            "Invalid page request",
            Some(error.to_string()),
        )
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { .. } => {
                ApiError::not_found("Resource not found").with_detail(error.to_string())
            }
            RepositoryError::Unsupported { .. } => {
                ApiError::not_found("Operation not available").with_detail(error.to_string())
            }
            RepositoryError::Invalid(ref inner) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(inner.to_string()),
            ),
            RepositoryError::Executor(ExecutorError::InvalidParameter { .. })
            | RepositoryError::Executor(ExecutorError::MissingParameter { .. }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(error.to_string()),
            ),
            RepositoryError::Executor(_) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::EXECUTOR,
                "Query execution failed",
                None,
            )
            .with_detail(error.to_string()),
            RepositoryError::Decode { .. } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Internal server error",
                None,
            )
            .with_detail(error.to_string()),
        }
    }
}
