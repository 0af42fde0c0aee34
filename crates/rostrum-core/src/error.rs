//! Error types for `rostrum-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::entry::TalkOccurrence;

#[derive(Debug, Error)]
pub enum Error {
  #[error("schedule entry not found: {0}")]
  EntryNotFound(Uuid),

  #[error("talk not found: {0}")]
  TalkNotFound(Uuid),

  #[error("speaker not found: {0}")]
  SpeakerNotFound(Uuid),

  #[error("congregation not found: {0}")]
  CongregationNotFound(Uuid),

  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("cannot interpret {0:?} as a calendar date")]
  InvalidDate(String),

  #[error("month must be between 1 and 12, got {0}")]
  InvalidMonth(u32),

  #[error("a talk with number {0} already exists")]
  DuplicateTalkNumber(u32),

  #[error("an arrangement for {year}-{month:02} already exists")]
  DuplicateArrangement { year: i32, month: u32 },

  #[error("talk {0} is still referenced by schedule or history rows")]
  TalkInUse(Uuid),

  #[error("speaker {0} is still referenced by schedule or history rows")]
  SpeakerInUse(Uuid),

  #[error("congregation {0} is still referenced")]
  CongregationInUse(Uuid),

  /// The talk was delivered or booked inside the lookback window and the
  /// caller did not confirm. Carries the conflicting occurrences so the
  /// caller can present them and resubmit with confirmation.
  #[error("talk was recently delivered; confirmation required")]
  ConfirmationRequired(Vec<TalkOccurrence>),

  /// The completion transition failed and was rolled back.
  #[error("completion transaction failed: {0}")]
  Transaction(String),

  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
