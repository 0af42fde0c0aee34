//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Calendar dates are stored as `YYYY-MM-DD`, instants as RFC 3339
//! strings, UUIDs as hyphenated lowercase strings, entry kinds as their
//! lowercase names and outline-number lists as comma-separated text.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use rostrum_core::{
  congregation::Congregation,
  date,
  entry::{EntryDetail, EntryKind, OccurrenceSource, ScheduleEntry, TalkOccurrence},
  history::{HistoryDetail, HistoryRecord},
  speaker::{Speaker, SpeakerDetail},
  talk::Talk,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_opt_uuid(id: Option<Uuid>) -> Option<String> {
  id.map(encode_uuid)
}

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Calendar dates ──────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { date::to_calendar_string(d) }

/// Reads go through the normaliser so a column value that picked up a
/// time component still surfaces as a bare calendar date.
pub fn decode_date(s: &str) -> Result<NaiveDate> {
  date::normalize_str(s)
    .ok()
    .flatten()
    .ok_or_else(|| Error::DateParse(format!("not a calendar date: {s:?}")))
}

pub fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── EntryKind ───────────────────────────────────────────────────────────────

pub fn encode_kind(k: EntryKind) -> String { k.to_string() }

pub fn decode_kind(s: &str) -> Result<EntryKind> {
  EntryKind::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown entry kind: {s:?}")))
}

// ─── Outline numbers ─────────────────────────────────────────────────────────

/// Encode a sorted outline-number list as `"4, 16, 24"`.
pub fn encode_outline_numbers(numbers: &[u32]) -> String {
  numbers
    .iter()
    .map(u32::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

/// Decode an outline-number list. Older rows used `;` as the separator;
/// both forms must keep decoding. Unparseable fragments are skipped.
pub fn decode_outline_numbers(s: &str) -> Vec<u32> {
  let sep = if s.contains(',') { ',' } else { ';' };
  let mut numbers: Vec<u32> = s
    .split(sep)
    .filter_map(|n| n.trim().parse().ok())
    .collect();
  numbers.sort_unstable();
  numbers.dedup();
  numbers
}

// ─── Talk number ─────────────────────────────────────────────────────────────

pub fn decode_talk_number(n: i64) -> Result<u32> {
  u32::try_from(n)
    .map_err(|_| Error::Decode(format!("talk number out of range: {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `schedule_entries` row joined with its
/// talk/speaker/congregation display fields.
pub struct RawEntryDetail {
  pub entry_id:          String,
  pub date:              String,
  pub talk_id:           Option<String>,
  pub speaker_id:        Option<String>,
  pub congregation_id:   Option<String>,
  pub kind:              String,
  pub notes:             Option<String>,
  pub talk_number:       Option<i64>,
  pub talk_topic:        Option<String>,
  pub speaker_name:      Option<String>,
  pub congregation_name: Option<String>,
}

impl RawEntryDetail {
  pub fn into_detail(self) -> Result<EntryDetail> {
    let entry = ScheduleEntry {
      entry_id:        decode_uuid(&self.entry_id)?,
      date:            decode_date(&self.date)?,
      talk_id:         decode_opt_uuid(self.talk_id)?,
      speaker_id:      decode_opt_uuid(self.speaker_id)?,
      congregation_id: decode_opt_uuid(self.congregation_id)?,
      kind:            decode_kind(&self.kind)?,
      notes:           self.notes,
    };
    Ok(EntryDetail {
      entry,
      talk_number: self.talk_number.map(decode_talk_number).transpose()?,
      talk_topic: self.talk_topic,
      speaker_name: self.speaker_name,
      congregation_name: self.congregation_name,
    })
  }
}

/// Raw strings read from a `talks` row.
pub struct RawTalk {
  pub talk_id:            String,
  pub number:             i64,
  pub topic:              String,
  pub outline_revised_on: Option<String>,
}

impl RawTalk {
  pub fn into_talk(self) -> Result<Talk> {
    Ok(Talk {
      talk_id:            decode_uuid(&self.talk_id)?,
      number:             decode_talk_number(self.number)?,
      topic:              self.topic,
      outline_revised_on: decode_opt_date(self.outline_revised_on)?,
    })
  }
}

/// Raw strings read from a `speakers` row joined with the home
/// congregation's name.
pub struct RawSpeakerDetail {
  pub speaker_id:        String,
  pub name:              String,
  pub phone:             Option<String>,
  pub email:             Option<String>,
  pub active:            bool,
  pub congregation_id:   Option<String>,
  pub outline_numbers:   String,
  pub congregation_name: Option<String>,
}

impl RawSpeakerDetail {
  pub fn into_detail(self) -> Result<SpeakerDetail> {
    let speaker = Speaker {
      speaker_id:      decode_uuid(&self.speaker_id)?,
      name:            self.name,
      phone:           self.phone,
      email:           self.email,
      active:          self.active,
      congregation_id: decode_opt_uuid(self.congregation_id)?,
      outline_numbers: decode_outline_numbers(&self.outline_numbers),
    };
    Ok(SpeakerDetail {
      speaker,
      congregation_name: self.congregation_name,
    })
  }
}

/// Raw strings read from a `congregations` row.
pub struct RawCongregation {
  pub congregation_id: String,
  pub name:            String,
  pub address:         Option<String>,
  pub contact_name:    Option<String>,
  pub contact_phone:   Option<String>,
  pub meeting_day:     Option<String>,
  pub meeting_time:    Option<String>,
}

impl RawCongregation {
  pub fn into_congregation(self) -> Result<Congregation> {
    Ok(Congregation {
      congregation_id: decode_uuid(&self.congregation_id)?,
      name:            self.name,
      address:         self.address,
      contact_name:    self.contact_name,
      contact_phone:   self.contact_phone,
      meeting_day:     self.meeting_day,
      meeting_time:    self.meeting_time,
    })
  }
}

/// Raw strings read from a `history_records` row joined with display
/// fields.
pub struct RawHistoryDetail {
  pub record_id:         String,
  pub talk_id:           Option<String>,
  pub speaker_id:        Option<String>,
  pub congregation_id:   Option<String>,
  pub date:              String,
  pub kind:              String,
  pub notes:             Option<String>,
  pub archived_at:       String,
  pub talk_number:       Option<i64>,
  pub talk_topic:        Option<String>,
  pub speaker_name:      Option<String>,
  pub congregation_name: Option<String>,
}

impl RawHistoryDetail {
  pub fn into_detail(self) -> Result<HistoryDetail> {
    let record = HistoryRecord {
      record_id:       decode_uuid(&self.record_id)?,
      talk_id:         decode_opt_uuid(self.talk_id)?,
      speaker_id:      decode_opt_uuid(self.speaker_id)?,
      congregation_id: decode_opt_uuid(self.congregation_id)?,
      date:            decode_date(&self.date)?,
      kind:            decode_kind(&self.kind)?,
      notes:           self.notes,
      archived_at:     decode_dt(&self.archived_at)?,
    };
    Ok(HistoryDetail {
      record,
      talk_number: self.talk_number.map(decode_talk_number).transpose()?,
      talk_topic: self.talk_topic,
      speaker_name: self.speaker_name,
      congregation_name: self.congregation_name,
    })
  }
}

/// Raw strings read from the duplicate-guard UNION over active entries and
/// history records.
pub struct RawOccurrence {
  pub source:          String,
  pub id:              String,
  pub talk_id:         Option<String>,
  pub speaker_id:      Option<String>,
  pub congregation_id: Option<String>,
  pub date:            String,
  pub kind:            String,
  pub notes:           Option<String>,
}

impl RawOccurrence {
  pub fn into_occurrence(self) -> Result<TalkOccurrence> {
    let source = match self.source.as_str() {
      "active" => OccurrenceSource::Active,
      "historical" => OccurrenceSource::Historical,
      other => {
        return Err(Error::Decode(format!(
          "unknown occurrence source: {other:?}"
        )));
      }
    };
    Ok(TalkOccurrence {
      source,
      id: decode_uuid(&self.id)?,
      talk_id: decode_opt_uuid(self.talk_id)?,
      speaker_id: decode_opt_uuid(self.speaker_id)?,
      congregation_id: decode_opt_uuid(self.congregation_id)?,
      date: decode_date(&self.date)?,
      kind: decode_kind(&self.kind)?,
      notes: self.notes,
    })
  }
}
