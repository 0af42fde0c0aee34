//! Handlers for `/arrangements` endpoints.
//!
//! An arrangement links a year/month to a set of congregations and is
//! unique per `(year, month)`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rostrum_core::{
  arrangement::{Arrangement, NewArrangement},
  store::{Page, PageRequest, ScheduleStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit:  Option<u64>,
  pub offset: Option<u64>,
}

/// `GET /arrangements[?limit=...][&offset=...]` — oldest first.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<Arrangement>>, ApiError>
where
  S: ScheduleStore,
{
  let page = PageRequest {
    limit:  params.limit,
    offset: params.offset.unwrap_or(0),
  };
  let result = store
    .list_arrangements(page)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(result))
}

// ─── Create / update ──────────────────────────────────────────────────────────

/// JSON body accepted by `POST /arrangements` and
/// `PUT /arrangements/{id}`.
#[derive(Debug, Deserialize)]
pub struct ArrangementBody {
  pub year:             i32,
  pub month:            u32,
  #[serde(default)]
  pub congregation_ids: Vec<Uuid>,
}

impl From<ArrangementBody> for NewArrangement {
  fn from(b: ArrangementBody) -> Self {
    NewArrangement {
      year:             b.year,
      month:            b.month,
      congregation_ids: b.congregation_ids,
    }
  }
}

/// `POST /arrangements` — 409 when the `(year, month)` slot is taken.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<ArrangementBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
{
  let arrangement = store
    .add_arrangement(NewArrangement::from(body))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(arrangement)))
}

/// `GET /arrangements/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Arrangement>, ApiError>
where
  S: ScheduleStore,
{
  let arrangement = store
    .get_arrangement(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("arrangement {id} not found")))?;
  Ok(Json(arrangement))
}

/// `PUT /arrangements/:id` — replaces the congregation links wholesale.
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ArrangementBody>,
) -> Result<Json<Arrangement>, ApiError>
where
  S: ScheduleStore,
{
  let arrangement = store
    .update_arrangement(id, NewArrangement::from(body))
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("arrangement {id} not found")))?;
  Ok(Json(arrangement))
}

/// `DELETE /arrangements/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ScheduleStore,
{
  store
    .delete_arrangement(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
