//! Handlers for `/congregations` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rostrum_core::{
  congregation::{Congregation, NewCongregation},
  history::HistoryDetail,
  store::{CongregationQuery, Page, PageRequest, ScheduleStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Substring match over name, address or contact name.
  pub search: Option<String>,
  pub limit:  Option<u64>,
  pub offset: Option<u64>,
}

/// `GET /congregations[?search=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<Congregation>>, ApiError>
where
  S: ScheduleStore,
{
  let query = CongregationQuery { search: params.search };
  let page = PageRequest {
    limit:  params.limit,
    offset: params.offset.unwrap_or(0),
  };
  let result = store
    .list_congregations(&query, page)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(result))
}

// ─── Create / update ──────────────────────────────────────────────────────────

/// JSON body accepted by `POST /congregations` and
/// `PUT /congregations/{id}`.
#[derive(Debug, Deserialize)]
pub struct CongregationBody {
  pub name:          String,
  pub address:       Option<String>,
  pub contact_name:  Option<String>,
  pub contact_phone: Option<String>,
  pub meeting_day:   Option<String>,
  pub meeting_time:  Option<String>,
}

impl From<CongregationBody> for NewCongregation {
  fn from(b: CongregationBody) -> Self {
    NewCongregation {
      name:          b.name,
      address:       b.address,
      contact_name:  b.contact_name,
      contact_phone: b.contact_phone,
      meeting_day:   b.meeting_day,
      meeting_time:  b.meeting_time,
    }
  }
}

/// `POST /congregations`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CongregationBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let congregation = store
    .add_congregation(NewCongregation::from(body))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(congregation)))
}

/// `GET /congregations/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Congregation>, ApiError>
where
  S: ScheduleStore,
{
  let congregation = store
    .get_congregation(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("congregation {id} not found")))?;
  Ok(Json(congregation))
}

/// `PUT /congregations/:id`
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CongregationBody>,
) -> Result<Json<Congregation>, ApiError>
where
  S: ScheduleStore,
{
  let congregation = store
    .update_congregation(id, NewCongregation::from(body))
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("congregation {id} not found")))?;
  Ok(Json(congregation))
}

/// `DELETE /congregations/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ScheduleStore,
{
  store
    .delete_congregation(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /congregations/:id/history` — talks received from this
/// congregation's speakers, newest first.
pub async fn history<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryDetail>>, ApiError>
where
  S: ScheduleStore,
{
  store
    .get_congregation(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("congregation {id} not found")))?;

  let history = store
    .congregation_received_history(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(history))
}
