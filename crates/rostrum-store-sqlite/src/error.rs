//! Error type for `rostrum-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rostrum_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column value did not decode into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

/// Collapse onto the domain taxonomy; backend-specific causes become
/// [`rostrum_core::Error::Storage`]. This is how the API layer maps store
/// failures onto HTTP statuses without depending on this crate.
impl From<Error> for rostrum_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => rostrum_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
