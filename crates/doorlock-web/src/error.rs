use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doorlock_core::enroll::EnrollError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("registration failed: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Database(#[from] tokio_rusqlite::Error),
    #[error("enrollment: {0}")]
    Enroll(EnrollError),
    #[error("malformed upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl From<EnrollError> for WebError {
    fn from(e: EnrollError) -> Self {
        match e {
            EnrollError::MissingField | EnrollError::EmptyName(_) => Self::BadRequest(e.to_string()),
            other => Self::Enroll(other),
        }
    }
}

impl From<rusqlite::Error> for WebError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(tokio_rusqlite::Error::Rusqlite(e))
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Enroll(_) => {
                tracing::error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
