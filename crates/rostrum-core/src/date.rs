//! Calendar-date normalisation.
//!
//! A delivery date crosses three representations: the wire (plain strings
//! or timestamps), the store (a date-only TEXT column) and the domain
//! (`NaiveDate`). Everything funnels through [`DateInput::normalize`] so a
//! date written as June 5 is never read back as June 4 or June 6 by a
//! process in another zone.

use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The canonical on-disk and on-wire form: `YYYY-MM-DD`.
pub const CALENDAR_FORMAT: &str = "%Y-%m-%d";

/// A date as it may arrive from a caller: a full instant, or a string
/// covering both the canonical `YYYY-MM-DD` form and timestamp strings
/// that carry a time component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
  Instant(DateTime<Utc>),
  Text(String),
}

impl DateInput {
  /// Normalise to an optional calendar date; blank input yields `None`.
  pub fn normalize(&self) -> Result<Option<NaiveDate>> {
    match self {
      DateInput::Text(s) => normalize_str(s),
      DateInput::Instant(dt) => Ok(Some(instant_to_calendar(*dt))),
    }
  }
}

/// Normalise a string into a calendar date.
///
/// - `YYYY-MM-DD` parses as-is;
/// - a string with a time component keeps only the date portion;
/// - blank input yields `None`;
/// - anything else is rejected.
///
/// Idempotent: normalising an already-canonical string is a no-op.
pub fn normalize_str(s: &str) -> Result<Option<NaiveDate>> {
  let trimmed = s.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }
  if let Ok(date) = NaiveDate::parse_from_str(trimmed, CALENDAR_FORMAT) {
    return Ok(Some(date));
  }
  if let Some((prefix, _)) = trimmed.split_once('T')
    && let Ok(date) = NaiveDate::parse_from_str(prefix, CALENDAR_FORMAT)
  {
    return Ok(Some(date));
  }
  Err(Error::InvalidDate(trimmed.to_owned()))
}

/// Extract the calendar date from an instant.
///
/// A date-only column read back through a driver surfaces as midnight UTC.
/// For that signature the calendar fields must be read in UTC — a reader
/// west of Greenwich would otherwise see the previous day. Instants with a
/// real time-of-day are interpreted in the local zone.
pub fn instant_to_calendar(dt: DateTime<Utc>) -> NaiveDate {
  let midnight_utc = dt.hour() == 0
    && dt.minute() == 0
    && dt.second() == 0
    && dt.nanosecond() == 0;
  if midnight_utc {
    dt.date_naive()
  } else {
    dt.with_timezone(&Local).date_naive()
  }
}

/// Render a date in the canonical `YYYY-MM-DD` form.
pub fn to_calendar_string(date: NaiveDate) -> String {
  date.format(CALENDAR_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn canonical_string_passes_through() {
    assert_eq!(
      normalize_str("2025-12-25").unwrap(),
      Some(date(2025, 12, 25))
    );
  }

  #[test]
  fn normalization_is_idempotent() {
    let once = normalize_str("2025-12-25").unwrap().unwrap();
    let twice = normalize_str(&to_calendar_string(once)).unwrap().unwrap();
    assert_eq!(once, twice);
  }

  #[test]
  fn timestamp_string_keeps_date_portion() {
    assert_eq!(
      normalize_str("2026-06-05T18:30:00Z").unwrap(),
      Some(date(2026, 6, 5))
    );
  }

  #[test]
  fn blank_input_is_none() {
    assert_eq!(normalize_str("").unwrap(), None);
    assert_eq!(normalize_str("   ").unwrap(), None);
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(matches!(
      normalize_str("next saturday"),
      Err(Error::InvalidDate(_))
    ));
  }

  #[test]
  fn utc_midnight_reads_calendar_fields_in_utc() {
    // The stored-date signature: exactly midnight UTC. The calendar date
    // must come out unchanged no matter what zone this process runs in.
    let dt: DateTime<Utc> = "2026-03-01T00:00:00Z".parse().unwrap();
    assert_eq!(instant_to_calendar(dt), date(2026, 3, 1));
  }

  #[test]
  fn non_midnight_instant_uses_local_fields() {
    let dt: DateTime<Utc> = "2026-03-01T15:45:00Z".parse().unwrap();
    assert_eq!(instant_to_calendar(dt), dt.with_timezone(&Local).date_naive());
  }

  #[test]
  fn date_input_deserialises_both_shapes() {
    let plain: DateInput = serde_json::from_str("\"2026-03-01\"").unwrap();
    assert_eq!(plain.normalize().unwrap(), Some(date(2026, 3, 1)));

    let instant: DateInput =
      serde_json::from_str("\"2026-03-01T00:00:00Z\"").unwrap();
    assert!(matches!(instant, DateInput::Instant(_)));
    assert_eq!(instant.normalize().unwrap(), Some(date(2026, 3, 1)));
  }
}
