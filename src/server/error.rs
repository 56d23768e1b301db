//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`aniweave_common::Error`]
//! converts with `?`.

use aniweave_common::Error;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: Error,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Error {
        &self.inner
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

// Extractor rejections share the JSON error body; pair them with
// `axum_extra::extract::WithRejection<_, AppError>`.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(Error::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(Error::validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                kind = self.inner.kind(),
                error = %self.inner,
                "Request failed upstream"
            );
        } else {
            tracing::debug!(status = %status, kind = self.inner.kind(), error = %self.inner, "Request rejected");
        }

        let body = json!({
            "ok": false,
            "error": self.inner.to_string(),
            "code": self.inner.kind(),
        });

        (status, axum::Json(body)).into_response()
    }
}
