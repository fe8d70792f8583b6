use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use codecell::{QueueTimeout, SubmitError, UnknownLanguage, WireResponse};

/// HTTP-facing error for the execution endpoints.
///
/// Wraps [`SubmitError`] and implements [`IntoResponse`] to produce
/// consistent JSON error bodies. Program failures never reach this type;
/// they are ordinary results.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<UnknownLanguage> for AppError {
    fn from(e: UnknownLanguage) -> Self {
        AppError::Submit(SubmitError::UnsupportedLanguage(e.0))
    }
}

impl From<QueueTimeout> for AppError {
    fn from(e: QueueTimeout) -> Self {
        AppError::Submit(SubmitError::QueueTimeout(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Submit(err) = &self;

        let (status, message) = match err {
            SubmitError::UnsupportedLanguage(_) | SubmitError::EmptySource => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            SubmitError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            SubmitError::QueueTimeout(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "the service is at capacity, try again shortly".to_owned(),
            ),
            SubmitError::Sandbox(e) => {
                tracing::error!(error = %e, "sandbox failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "the service could not run the program".to_owned(),
                )
            }
            SubmitError::Lifecycle(e) => {
                tracing::error!(error = %e, "job lifecycle fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "the service could not run the program".to_owned(),
                )
            }
        };

        let body = WireResponse::service_error(message);
        (status, axum::Json(body)).into_response()
    }
}
