//! Handlers for `/speakers` endpoints.
//!
//! The speaker's outline-number list is read-only here: it is derived
//! state owned by the completion transition.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rostrum_core::{
  history::HistoryDetail,
  speaker::{NewSpeaker, SpeakerDetail},
  store::{Page, PageRequest, ScheduleStore, SpeakerQuery},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Substring match over name, email or phone.
  pub search:          Option<String>,
  pub active:          Option<bool>,
  pub congregation_id: Option<Uuid>,
  pub limit:           Option<u64>,
  pub offset:          Option<u64>,
}

/// `GET /speakers[?search=...][&active=...][&congregation_id=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<SpeakerDetail>>, ApiError>
where
  S: ScheduleStore,
{
  let query = SpeakerQuery {
    search:          params.search,
    active:          params.active,
    congregation_id: params.congregation_id,
  };
  let page = PageRequest {
    limit:  params.limit,
    offset: params.offset.unwrap_or(0),
  };
  let result = store
    .list_speakers(&query, page)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(result))
}

// ─── Create / update ──────────────────────────────────────────────────────────

fn default_active() -> bool { true }

/// JSON body accepted by `POST /speakers` and `PUT /speakers/{id}`.
#[derive(Debug, Deserialize)]
pub struct SpeakerBody {
  pub name:            String,
  pub phone:           Option<String>,
  pub email:           Option<String>,
  #[serde(default = "default_active")]
  pub active:          bool,
  pub congregation_id: Option<Uuid>,
}

impl From<SpeakerBody> for NewSpeaker {
  fn from(b: SpeakerBody) -> Self {
    NewSpeaker {
      name:            b.name,
      phone:           b.phone,
      email:           b.email,
      active:          b.active,
      congregation_id: b.congregation_id,
    }
  }
}

/// `POST /speakers`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<SpeakerBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let speaker = store
    .add_speaker(NewSpeaker::from(body))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(speaker)))
}

/// `GET /speakers/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SpeakerDetail>, ApiError>
where
  S: ScheduleStore,
{
  let speaker = store
    .get_speaker(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("speaker {id} not found")))?;
  Ok(Json(speaker))
}

/// `PUT /speakers/:id`
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SpeakerBody>,
) -> Result<Json<SpeakerDetail>, ApiError>
where
  S: ScheduleStore,
{
  let speaker = store
    .update_speaker(id, NewSpeaker::from(body))
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("speaker {id} not found")))?;
  Ok(Json(speaker))
}

/// `DELETE /speakers/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ScheduleStore,
{
  store.delete_speaker(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /speakers/:id/history` — deliveries where the speaker was sent
/// out, newest first.
pub async fn history<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryDetail>>, ApiError>
where
  S: ScheduleStore,
{
  store
    .get_speaker(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("speaker {id} not found")))?;

  let history = store
    .speaker_sent_history(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(history))
}
