//! The `ScheduleStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `rostrum-store-sqlite`). Higher layers (`rostrum-api`,
//! `rostrum-server`) depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  arrangement::{Arrangement, NewArrangement},
  congregation::{Congregation, NewCongregation},
  entry::{EntryDetail, EntryKind, NewEntry, TalkOccurrence},
  history::HistoryDetail,
  speaker::{NewSpeaker, SpeakerDetail},
  talk::{NewTalk, Talk},
};

/// Days the duplicate guard looks back for prior deliveries of a talk.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 180;

// ─── Pagination ──────────────────────────────────────────────────────────────

/// A page of results. `total` counts every row matching the filters,
/// ignoring `limit`/`offset`.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

/// Limit/offset applied after filtering. Absent limit means all rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
  pub limit:  Option<u64>,
  pub offset: u64,
}

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filters for [`ScheduleStore::list_entries`]; combined with AND.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
  /// Case-insensitive substring match over talk number, talk topic,
  /// speaker name or congregation name.
  pub search:          Option<String>,
  /// Single-kind filter; ignored when `kinds` is non-empty.
  pub kind:            Option<EntryKind>,
  /// Multi-kind filter; takes precedence over `kind`.
  pub kinds:           Vec<EntryKind>,
  pub congregation_id: Option<Uuid>,
  /// Inclusive lower bound on the delivery date.
  pub from:            Option<NaiveDate>,
  /// Inclusive upper bound on the delivery date.
  pub to:              Option<NaiveDate>,
}

/// Filters for [`ScheduleStore::list_talks`].
#[derive(Debug, Clone, Default)]
pub struct TalkQuery {
  /// Substring match over number-as-text or topic.
  pub search: Option<String>,
}

/// Filters for [`ScheduleStore::list_speakers`].
#[derive(Debug, Clone, Default)]
pub struct SpeakerQuery {
  /// Substring match over name, email or phone.
  pub search:          Option<String>,
  pub active:          Option<bool>,
  pub congregation_id: Option<Uuid>,
}

/// Filters for [`ScheduleStore::list_congregations`].
#[derive(Debug, Clone, Default)]
pub struct CongregationQuery {
  /// Substring match over name, address or contact name.
  pub search: Option<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Rostrum storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Backend errors
/// convert into the domain taxonomy via the `Into<Error>` bound, which is
/// how the API layer maps them onto HTTP statuses.
pub trait ScheduleStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Schedule entries ──────────────────────────────────────────────────

  /// Filtered, paginated listing of active entries, ascending by date.
  fn list_entries<'a>(
    &'a self,
    query: &'a EntryQuery,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<EntryDetail>, Self::Error>> + Send + 'a;

  /// Retrieve one entry, denormalised. `None` if not found.
  fn get_entry(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<EntryDetail>, Self::Error>> + Send + '_;

  /// Create an entry.
  ///
  /// When the entry references a talk that was delivered or booked within
  /// the last [`DEFAULT_LOOKBACK_DAYS`] days and `confirm` is `false`, the
  /// create is refused with [`crate::Error::ConfirmationRequired`] carrying
  /// the conflicting occurrences; resubmitting with `confirm = true`
  /// forces creation. Entries without a talk reference skip the check.
  fn create_entry(
    &self,
    input: NewEntry,
    confirm: bool,
  ) -> impl Future<Output = Result<EntryDetail, Self::Error>> + Send + '_;

  /// Update an entry; edits never re-trigger the duplicate guard.
  /// `None` if the id does not exist.
  fn update_entry(
    &self,
    id: Uuid,
    input: NewEntry,
  ) -> impl Future<Output = Result<Option<EntryDetail>, Self::Error>> + Send + '_;

  /// Remove an entry. Idempotent: a missing id is a no-op success.
  fn delete_entry(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Archive a delivered entry: copy it into history, fold its talk
  /// number into the speaker's outline list, remove the active row — as
  /// one all-or-nothing unit of work. Fails with
  /// [`crate::Error::EntryNotFound`] if the id does not exist.
  fn complete_entry(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Recent deliveries/bookings of a talk across both the active schedule
  /// and history, newest first. The cutoff (`today − lookback_days`) is
  /// inclusive.
  fn recent_talk_occurrences(
    &self,
    talk_id: Uuid,
    lookback_days: u32,
  ) -> impl Future<Output = Result<Vec<TalkOccurrence>, Self::Error>> + Send + '_;

  /// Monday-truncated start dates of the weeks in `[from, to]` that have
  /// at least one weekend entry occupying the home platform, sorted
  /// ascending.
  fn covered_week_starts(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<NaiveDate>, Self::Error>> + Send + '_;

  // ── Talks ─────────────────────────────────────────────────────────────

  fn add_talk(
    &self,
    input: NewTalk,
  ) -> impl Future<Output = Result<Talk, Self::Error>> + Send + '_;

  fn get_talk(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Talk>, Self::Error>> + Send + '_;

  /// Ordered by talk number.
  fn list_talks<'a>(
    &'a self,
    query: &'a TalkQuery,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Talk>, Self::Error>> + Send + 'a;

  fn update_talk(
    &self,
    id: Uuid,
    input: NewTalk,
  ) -> impl Future<Output = Result<Option<Talk>, Self::Error>> + Send + '_;

  /// Rejected with [`crate::Error::TalkInUse`] while schedule or history
  /// rows still reference the talk.
  fn delete_talk(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All archived deliveries of a talk, newest first.
  fn talk_history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<HistoryDetail>, Self::Error>> + Send + '_;

  // ── Speakers ──────────────────────────────────────────────────────────

  fn add_speaker(
    &self,
    input: NewSpeaker,
  ) -> impl Future<Output = Result<SpeakerDetail, Self::Error>> + Send + '_;

  fn get_speaker(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SpeakerDetail>, Self::Error>> + Send + '_;

  /// Ordered by name.
  fn list_speakers<'a>(
    &'a self,
    query: &'a SpeakerQuery,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<SpeakerDetail>, Self::Error>> + Send + 'a;

  /// Updates everything except the derived outline-number list.
  fn update_speaker(
    &self,
    id: Uuid,
    input: NewSpeaker,
  ) -> impl Future<Output = Result<Option<SpeakerDetail>, Self::Error>> + Send + '_;

  fn delete_speaker(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Archived deliveries where this speaker was sent out, newest first.
  fn speaker_sent_history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<HistoryDetail>, Self::Error>> + Send + '_;

  // ── Congregations ─────────────────────────────────────────────────────

  fn add_congregation(
    &self,
    input: NewCongregation,
  ) -> impl Future<Output = Result<Congregation, Self::Error>> + Send + '_;

  fn get_congregation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Congregation>, Self::Error>> + Send + '_;

  /// Ordered by name.
  fn list_congregations<'a>(
    &'a self,
    query: &'a CongregationQuery,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Congregation>, Self::Error>> + Send + 'a;

  fn update_congregation(
    &self,
    id: Uuid,
    input: NewCongregation,
  ) -> impl Future<Output = Result<Option<Congregation>, Self::Error>> + Send + '_;

  fn delete_congregation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Archived visits received from this congregation, newest first.
  fn congregation_received_history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<HistoryDetail>, Self::Error>> + Send + '_;

  // ── Arrangements ──────────────────────────────────────────────────────

  /// Rejected with [`crate::Error::DuplicateArrangement`] when a plan for
  /// the same `(year, month)` already exists.
  fn add_arrangement(
    &self,
    input: NewArrangement,
  ) -> impl Future<Output = Result<Arrangement, Self::Error>> + Send + '_;

  fn get_arrangement(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Arrangement>, Self::Error>> + Send + '_;

  /// Ordered by year then month, oldest first.
  fn list_arrangements(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Arrangement>, Self::Error>> + Send + '_;

  fn update_arrangement(
    &self,
    id: Uuid,
    input: NewArrangement,
  ) -> impl Future<Output = Result<Option<Arrangement>, Self::Error>> + Send + '_;

  fn delete_arrangement(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
