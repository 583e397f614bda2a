use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;

/// Failure of a data-access operation.
///
/// Callers can tell "absent" apart from "store unreachable" instead of
/// getting nothing back in both cases.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid: {0}")]
    Invalid(String),
}

impl DataError {
    pub fn status(&self) -> StatusCode {
        use DataError::*;
        match self {
            NotFound(_) => StatusCode::NOT_FOUND,
            Conflict(_) => StatusCode::CONFLICT,
            Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Invalid(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        DataError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Invalid(err.to_string())
    }
}

pub type DataResult<T> = Result<T, DataError>;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<DataError>() {
            tracing::warn!(error = %err, "request failed");
            return (err.status(), err.to_string()).into_response();
        }

        tracing::error!(error = %self.0, "unhandled error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
