//! Handlers for `/schedule` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/schedule` | Filters + `limit`/`offset`; `{items, total}` |
//! | `POST`   | `/schedule` | 201, or 409 when confirmation is required |
//! | `GET`    | `/schedule/gaps` | Weeks lacking weekend coverage |
//! | `GET`    | `/schedule/:id` | 404 if not found |
//! | `PUT`    | `/schedule/:id` | Same body as create; guard not re-run |
//! | `DELETE` | `/schedule/:id` | 204; idempotent |
//! | `POST`   | `/schedule/:id/complete` | Archives into history |

use std::{collections::BTreeSet, str::FromStr as _, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{Local, NaiveDate};
use rostrum_core::{
  date::DateInput,
  entry::{EntryDetail, EntryKind, NewEntry},
  gaps::{self, GapWeek},
  store::{EntryQuery, Page, PageRequest, ScheduleStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Substring match over talk number, topic, speaker or congregation.
  pub search:          Option<String>,
  pub kind:            Option<EntryKind>,
  /// Comma-separated kinds, e.g. `sent,received`; wins over `kind`.
  pub kinds:           Option<String>,
  pub congregation_id: Option<Uuid>,
  /// Inclusive date-range bounds, `YYYY-MM-DD`.
  pub from:            Option<NaiveDate>,
  pub to:              Option<NaiveDate>,
  pub limit:           Option<u64>,
  pub offset:          Option<u64>,
}

fn parse_kinds(s: &str) -> Result<Vec<EntryKind>, ApiError> {
  s.split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(|t| {
      EntryKind::from_str(t)
        .map_err(|_| ApiError::BadRequest(format!("unknown entry kind: {t:?}")))
    })
    .collect()
}

/// `GET /schedule[?search=...][&kind=...][&kinds=...][&from=...][&to=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<EntryDetail>>, ApiError>
where
  S: ScheduleStore,
{
  let kinds = params
    .kinds
    .as_deref()
    .map(parse_kinds)
    .transpose()?
    .unwrap_or_default();

  let query = EntryQuery {
    search: params.search,
    kind: params.kind,
    kinds,
    congregation_id: params.congregation_id,
    from: params.from,
    to: params.to,
  };
  let page = PageRequest {
    limit:  params.limit,
    offset: params.offset.unwrap_or(0),
  };

  let result = store
    .list_entries(&query, page)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(result))
}

// ─── Create / update body ─────────────────────────────────────────────────────

/// JSON body accepted by `POST /schedule` and `PUT /schedule/{id}`.
///
/// `date` accepts either the canonical `YYYY-MM-DD` form or a timestamp;
/// it is normalised before anything touches the store.
#[derive(Debug, Deserialize)]
pub struct EntryBody {
  pub date:            Option<DateInput>,
  pub talk_id:         Option<Uuid>,
  pub speaker_id:      Option<Uuid>,
  pub congregation_id: Option<Uuid>,
  pub kind:            Option<EntryKind>,
  pub notes:           Option<String>,
  /// Acknowledges the duplicate guard on create; ignored on update.
  #[serde(default)]
  pub confirm:         bool,
}

impl EntryBody {
  fn into_new_entry(self) -> Result<NewEntry, ApiError> {
    let date = match &self.date {
      None => None,
      Some(input) => input.normalize().map_err(ApiError::from)?,
    };
    let date =
      date.ok_or(rostrum_core::Error::MissingField("date"))?;
    let kind =
      self.kind.ok_or(rostrum_core::Error::MissingField("kind"))?;

    Ok(NewEntry {
      date,
      talk_id: self.talk_id,
      speaker_id: self.speaker_id,
      congregation_id: self.congregation_id,
      kind,
      notes: self.notes,
    })
  }
}

/// `POST /schedule` — 201 with the denormalised row, or 409 with the
/// conflicting occurrences when the duplicate guard fires.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<EntryBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let confirm = body.confirm;
  let input = body.into_new_entry()?;
  let entry = store
    .create_entry(input, confirm)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(entry)))
}

// ─── Get / update / delete ────────────────────────────────────────────────────

/// `GET /schedule/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<EntryDetail>, ApiError>
where
  S: ScheduleStore,
{
  let entry = store
    .get_entry(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("schedule entry {id} not found")))?;
  Ok(Json(entry))
}

/// `PUT /schedule/:id`
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<EntryBody>,
) -> Result<Json<EntryDetail>, ApiError>
where
  S: ScheduleStore,
{
  let input = body.into_new_entry()?;
  let entry = store
    .update_entry(id, input)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("schedule entry {id} not found")))?;
  Ok(Json(entry))
}

/// `DELETE /schedule/:id` — 204 even when the id never existed.
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ScheduleStore,
{
  store.delete_entry(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Complete ─────────────────────────────────────────────────────────────────

/// `POST /schedule/:id/complete` — archive a delivered talk.
pub async fn complete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ScheduleStore,
{
  store.complete_entry(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Gap weeks ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GapParams {
  /// Number of Monday–Sunday weeks to scan.
  pub weeks: Option<u32>,
}

/// `GET /schedule/gaps[?weeks=N]` — weeks in the forward window with no
/// weekend talk occupying the home platform.
pub async fn gap_weeks<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<GapParams>,
) -> Result<Json<Vec<GapWeek>>, ApiError>
where
  S: ScheduleStore,
{
  let weeks = params.weeks.unwrap_or(gaps::DEFAULT_WINDOW_WEEKS);
  let today = Local::now().date_naive();
  let (start, end) = gaps::window(today, weeks);

  let covered: BTreeSet<NaiveDate> = store
    .covered_week_starts(start, end)
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .collect();

  Ok(Json(gaps::find_gaps(start, end, &covered)))
}
