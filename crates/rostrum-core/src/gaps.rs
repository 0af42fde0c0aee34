//! Gap-week detection — pure calendar math over the schedule.
//!
//! A week is covered when at least one Saturday or Sunday entry of a kind
//! that occupies the home platform (`local` or `received`) falls inside
//! it. The storage side supplies the covered week-starts; everything here
//! is deterministic and side-effect free.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Number of Monday–Sunday weeks the forward scan covers by default.
pub const DEFAULT_WINDOW_WEEKS: u32 = 5;

/// A Monday–Sunday week with no qualifying weekend entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapWeek {
  pub start:   NaiveDate,
  pub end:     NaiveDate,
  pub message: String,
}

/// The Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
  date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Whether `date` falls on a Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
  matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The scan window: `weeks` full Monday–Sunday weeks.
///
/// Starts on the current week's Monday while that week's Sunday is still
/// ahead, otherwise on the following Monday. The end is the Sunday of the
/// last week in the window.
pub fn window(today: NaiveDate, weeks: u32) -> (NaiveDate, NaiveDate) {
  let weeks = weeks.max(1);
  let monday = week_start(today);
  let sunday = monday + Days::new(6);
  let start = if sunday < today {
    monday + Days::new(7)
  } else {
    monday
  };
  let end = start + Days::new(u64::from(weeks) * 7 - 1);
  (start, end)
}

/// Enumerate every Monday in `[start, end]` and report those absent from
/// `covered` as gaps, in chronological order.
pub fn find_gaps(
  start: NaiveDate,
  end: NaiveDate,
  covered: &BTreeSet<NaiveDate>,
) -> Vec<GapWeek> {
  let mut gaps = Vec::new();
  let mut monday = start;
  while monday <= end {
    if !covered.contains(&monday) {
      let sunday = monday + Days::new(6);
      gaps.push(GapWeek {
        start:   monday,
        end:     sunday,
        message: format!(
          "no talk scheduled for the week of {monday} to {sunday}"
        ),
      });
    }
    monday = monday + Days::new(7);
  }
  gaps
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn week_start_truncates_to_monday() {
    // 2026-03-04 is a Wednesday; its week starts on Monday 2026-03-02.
    assert_eq!(week_start(date(2026, 3, 4)), date(2026, 3, 2));
    assert_eq!(week_start(date(2026, 3, 2)), date(2026, 3, 2));
    // Sunday belongs to the week that started six days earlier.
    assert_eq!(week_start(date(2026, 3, 8)), date(2026, 3, 2));
  }

  #[test]
  fn window_spans_exactly_n_weeks() {
    let (start, end) = window(date(2026, 3, 4), 5);
    assert_eq!(start, date(2026, 3, 2));
    // Sunday of the fifth week: 2026-03-02 + 34 days.
    assert_eq!(end, date(2026, 4, 5));
  }

  #[test]
  fn window_starting_on_sunday_keeps_current_week() {
    // Today is Sunday; the current week's Sunday has not passed yet.
    let (start, _) = window(date(2026, 3, 8), 5);
    assert_eq!(start, date(2026, 3, 2));
  }

  #[test]
  fn full_coverage_yields_no_gaps() {
    let (start, end) = window(date(2026, 3, 2), 5);
    let covered: BTreeSet<_> =
      (0..5).map(|w| start + Days::new(w * 7)).collect();
    assert!(find_gaps(start, end, &covered).is_empty());
  }

  #[test]
  fn one_missing_week_yields_one_gap() {
    let (start, end) = window(date(2026, 3, 2), 5);
    // Weeks 1, 2, 4, 5 covered; week 3 missing.
    let covered: BTreeSet<_> = [0u64, 1, 3, 4]
      .into_iter()
      .map(|w| start + Days::new(w * 7))
      .collect();

    let gaps = find_gaps(start, end, &covered);
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].start, start + Days::new(14));
    assert_eq!(gaps[0].end, start + Days::new(20));
    assert!(gaps[0].message.contains(&gaps[0].start.to_string()));
  }

  #[test]
  fn empty_coverage_reports_every_week() {
    let (start, end) = window(date(2026, 3, 2), 5);
    let gaps = find_gaps(start, end, &BTreeSet::new());
    assert_eq!(gaps.len(), 5);
    // Chronological order.
    assert!(gaps.windows(2).all(|w| w[0].start < w[1].start));
  }
}
