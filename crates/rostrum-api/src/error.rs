//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rostrum_core::entry::TalkOccurrence;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The duplicate guard refused a create. The response body carries the
  /// conflicting occurrences; the caller may resubmit with
  /// `confirm = true`.
  #[error("confirmation required")]
  ConfirmationRequired(Vec<TalkOccurrence>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Map a store-layer error onto the HTTP taxonomy.
  pub fn from_store<E: Into<rostrum_core::Error>>(e: E) -> Self {
    Self::from(e.into())
  }
}

impl From<rostrum_core::Error> for ApiError {
  fn from(e: rostrum_core::Error) -> Self {
    use rostrum_core::Error as E;
    match e {
      E::ConfirmationRequired(occurrences) => {
        Self::ConfirmationRequired(occurrences)
      }
      E::EntryNotFound(_) => Self::NotFound(e.to_string()),
      // A dangling reference in a write payload is the caller's mistake.
      E::TalkNotFound(_)
      | E::SpeakerNotFound(_)
      | E::CongregationNotFound(_)
      | E::MissingField(_)
      | E::InvalidDate(_)
      | E::InvalidMonth(_)
      | E::TalkInUse(_)
      | E::SpeakerInUse(_)
      | E::CongregationInUse(_) => Self::BadRequest(e.to_string()),
      E::DuplicateTalkNumber(_) | E::DuplicateArrangement { .. } => {
        Self::Conflict(e.to_string())
      }
      E::Transaction(_) | E::Storage(_) => Self::Internal(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Conflict(m) => {
        (StatusCode::CONFLICT, Json(json!({ "error": m }))).into_response()
      }
      ApiError::ConfirmationRequired(occurrences) => (
        StatusCode::CONFLICT,
        Json(json!({
          "confirm_required": true,
          "message": "this talk was delivered within the lookback window; \
                      resubmit with confirm=true to schedule it anyway",
          "occurrences": occurrences,
        })),
      )
        .into_response(),
      ApiError::Internal(m) => {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": m })))
          .into_response()
      }
    }
  }
}
