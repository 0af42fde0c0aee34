//! Schedule entries — active, not-yet-delivered talk assignments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Where a talk is delivered relative to the home congregation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
  /// Delivered at the home congregation by a home speaker.
  Local,
  /// A home speaker delivers elsewhere.
  Sent,
  /// A visiting speaker delivers at the home congregation.
  Received,
}

impl EntryKind {
  /// Whether an entry of this kind keeps the home platform occupied.
  /// A week where the only entry is `sent` still needs local coverage.
  pub fn covers_home_weekend(self) -> bool {
    matches!(self, Self::Local | Self::Received)
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// An active schedule entry. Destroyed either by direct deletion or by the
/// completion transition archiving it into history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
  pub entry_id:        Uuid,
  /// Delivery date; a pure calendar date with no time-of-day or zone.
  pub date:            NaiveDate,
  pub talk_id:         Option<Uuid>,
  pub speaker_id:      Option<Uuid>,
  pub congregation_id: Option<Uuid>,
  pub kind:            EntryKind,
  pub notes:           Option<String>,
}

/// Input to create/update. Referenced ids are validated against the
/// talk/speaker/congregation tables at write time.
#[derive(Debug, Clone)]
pub struct NewEntry {
  pub date:            NaiveDate,
  pub talk_id:         Option<Uuid>,
  pub speaker_id:      Option<Uuid>,
  pub congregation_id: Option<Uuid>,
  pub kind:            EntryKind,
  pub notes:           Option<String>,
}

/// An entry joined with the display fields clients render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDetail {
  #[serde(flatten)]
  pub entry:             ScheduleEntry,
  pub talk_number:       Option<u32>,
  pub talk_topic:        Option<String>,
  pub speaker_name:      Option<String>,
  pub congregation_name: Option<String>,
}

// ─── Recent occurrences ──────────────────────────────────────────────────────

/// Which row set a recent occurrence was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceSource {
  Active,
  Historical,
}

/// A recent delivery or booking of a talk, surfaced by the duplicate
/// guard. Newest first when returned in a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalkOccurrence {
  pub source:          OccurrenceSource,
  pub id:              Uuid,
  pub talk_id:         Option<Uuid>,
  pub speaker_id:      Option<Uuid>,
  pub congregation_id: Option<Uuid>,
  pub date:            NaiveDate,
  pub kind:            EntryKind,
  pub notes:           Option<String>,
}
