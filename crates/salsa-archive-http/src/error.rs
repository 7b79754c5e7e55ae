//! Request errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::http::header::InvalidHeaderValue;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Errors a request can end in.
///
/// Only the status and a fixed message reach the client. Storage details are
/// logged here and dropped.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// Missing or malformed request parameter.
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  /// No such record, or the record lacks the requested artifact.
  #[error("not found")]
  NotFound,

  /// The archive could not be read.
  #[error("storage error: {0}")]
  Storage(#[source] salsa_archive_store::Error),

  /// A response header could not be built.
  #[error("invalid response header: {0}")]
  Header(#[from] InvalidHeaderValue),
}

impl ApiError {
  pub fn invalid(message: impl Into<String>) -> Self {
    Self::InvalidRequest(message.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
      Self::NotFound => StatusCode::NOT_FOUND,
      Self::Storage(_) | Self::Header(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<salsa_archive_store::Error> for ApiError {
  fn from(err: salsa_archive_store::Error) -> Self {
    if err.is_not_found() {
      Self::NotFound
    } else {
      Self::Storage(err)
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      Self::InvalidRequest(message) => format!("bad request: {message}"),
      Self::NotFound => "not found".to_string(),
      Self::Storage(_) | Self::Header(_) => {
        error!(error = %self, "request failed");
        "internal server error".to_string()
      }
    };
    (status, body).into_response()
  }
}
