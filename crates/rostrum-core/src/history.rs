//! History records — immutable archival copies of delivered entries.
//!
//! Written only by the completion transition; never updated or deleted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::EntryKind;

/// An archived delivery. Carries the same content fields as the schedule
/// entry it was copied from, plus the time of archival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
  pub record_id:       Uuid,
  pub talk_id:         Option<Uuid>,
  pub speaker_id:      Option<Uuid>,
  pub congregation_id: Option<Uuid>,
  pub date:            NaiveDate,
  pub kind:            EntryKind,
  pub notes:           Option<String>,
  /// Server-assigned at archival; never changes.
  pub archived_at:     DateTime<Utc>,
}

/// A history record joined with the display fields clients render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryDetail {
  #[serde(flatten)]
  pub record:            HistoryRecord,
  pub talk_number:       Option<u32>,
  pub talk_topic:        Option<String>,
  pub speaker_name:      Option<String>,
  pub congregation_name: Option<String>,
}
