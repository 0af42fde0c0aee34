//! Handlers for `/talks` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/talks` | `?search=`, paginated |
//! | `POST`   | `/talks` | 409 on a duplicate talk number |
//! | `GET`    | `/talks/:id` | |
//! | `PUT`    | `/talks/:id` | |
//! | `DELETE` | `/talks/:id` | 400 while schedule/history rows reference it |
//! | `GET`    | `/talks/:id/occurrences` | Duplicate-guard view, `?lookback_days=` |
//! | `GET`    | `/talks/:id/history` | All archived deliveries |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rostrum_core::{
  date::DateInput,
  entry::TalkOccurrence,
  history::HistoryDetail,
  store::{DEFAULT_LOOKBACK_DAYS, Page, PageRequest, ScheduleStore, TalkQuery},
  talk::{NewTalk, Talk},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
  pub limit:  Option<u64>,
  pub offset: Option<u64>,
}

/// `GET /talks[?search=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<Talk>>, ApiError>
where
  S: ScheduleStore,
{
  let query = TalkQuery { search: params.search };
  let page = PageRequest {
    limit:  params.limit,
    offset: params.offset.unwrap_or(0),
  };
  let result = store
    .list_talks(&query, page)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(result))
}

// ─── Create / update ──────────────────────────────────────────────────────────

/// JSON body accepted by `POST /talks` and `PUT /talks/{id}`.
#[derive(Debug, Deserialize)]
pub struct TalkBody {
  pub number:             u32,
  pub topic:              String,
  pub outline_revised_on: Option<DateInput>,
}

impl TalkBody {
  fn into_new_talk(self) -> Result<NewTalk, ApiError> {
    let outline_revised_on = match &self.outline_revised_on {
      None => None,
      Some(input) => input.normalize().map_err(ApiError::from)?,
    };
    Ok(NewTalk {
      number: self.number,
      topic: self.topic,
      outline_revised_on,
    })
  }
}

/// `POST /talks`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<TalkBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let talk = store
    .add_talk(body.into_new_talk()?)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(talk)))
}

/// `GET /talks/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Talk>, ApiError>
where
  S: ScheduleStore,
{
  let talk = store
    .get_talk(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("talk {id} not found")))?;
  Ok(Json(talk))
}

/// `PUT /talks/:id`
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TalkBody>,
) -> Result<Json<Talk>, ApiError>
where
  S: ScheduleStore,
{
  let talk = store
    .update_talk(id, body.into_new_talk()?)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("talk {id} not found")))?;
  Ok(Json(talk))
}

/// `DELETE /talks/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ScheduleStore,
{
  store.delete_talk(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Occurrences ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OccurrenceParams {
  /// How many days back to look; defaults to the guard's window.
  pub lookback_days: Option<u32>,
}

/// `GET /talks/:id/occurrences[?lookback_days=N]` — the duplicate guard's
/// view of recent deliveries and bookings, newest first.
pub async fn occurrences<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<OccurrenceParams>,
) -> Result<Json<Vec<TalkOccurrence>>, ApiError>
where
  S: ScheduleStore,
{
  store
    .get_talk(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("talk {id} not found")))?;

  let lookback = params.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
  let occurrences = store
    .recent_talk_occurrences(id, lookback)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(occurrences))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /talks/:id/history`
pub async fn history<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryDetail>>, ApiError>
where
  S: ScheduleStore,
{
  store
    .get_talk(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("talk {id} not found")))?;

  let history =
    store.talk_history(id).await.map_err(ApiError::from_store)?;
  Ok(Json(history))
}
