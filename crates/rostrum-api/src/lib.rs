//! JSON REST API for Rostrum.
//!
//! Exposes an axum [`Router`] backed by any
//! [`rostrum_core::store::ScheduleStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rostrum_api::api_router(store.clone()))
//! ```

pub mod arrangements;
pub mod congregations;
pub mod error;
pub mod schedule;
pub mod speakers;
pub mod talks;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rostrum_core::store::ScheduleStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ScheduleStore + 'static,
{
  Router::new()
    // Schedule
    .route(
      "/schedule",
      get(schedule::list::<S>).post(schedule::create::<S>),
    )
    .route("/schedule/gaps", get(schedule::gap_weeks::<S>))
    .route(
      "/schedule/{id}",
      get(schedule::get_one::<S>)
        .put(schedule::update_one::<S>)
        .delete(schedule::delete_one::<S>),
    )
    .route("/schedule/{id}/complete", post(schedule::complete_one::<S>))
    // Talks
    .route("/talks", get(talks::list::<S>).post(talks::create::<S>))
    .route(
      "/talks/{id}",
      get(talks::get_one::<S>)
        .put(talks::update_one::<S>)
        .delete(talks::delete_one::<S>),
    )
    .route("/talks/{id}/occurrences", get(talks::occurrences::<S>))
    .route("/talks/{id}/history", get(talks::history::<S>))
    // Speakers
    .route(
      "/speakers",
      get(speakers::list::<S>).post(speakers::create::<S>),
    )
    .route(
      "/speakers/{id}",
      get(speakers::get_one::<S>)
        .put(speakers::update_one::<S>)
        .delete(speakers::delete_one::<S>),
    )
    .route("/speakers/{id}/history", get(speakers::history::<S>))
    // Congregations
    .route(
      "/congregations",
      get(congregations::list::<S>).post(congregations::create::<S>),
    )
    .route(
      "/congregations/{id}",
      get(congregations::get_one::<S>)
        .put(congregations::update_one::<S>)
        .delete(congregations::delete_one::<S>),
    )
    .route(
      "/congregations/{id}/history",
      get(congregations::history::<S>),
    )
    // Arrangements
    .route(
      "/arrangements",
      get(arrangements::list::<S>).post(arrangements::create::<S>),
    )
    .route(
      "/arrangements/{id}",
      get(arrangements::get_one::<S>)
        .put(arrangements::update_one::<S>)
        .delete(arrangements::delete_one::<S>),
    )
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{Days, Local};
  use rostrum_core::gaps;
  use rostrum_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn router() -> Router {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    api_router(store)
  }

  async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        builder.body(Body::from(v.to_string())).unwrap()
      }
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      // Not every rejection body is JSON (e.g. axum's extractor rejections
      // are plain text); fall back to a string value instead of panicking.
      serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
      })
    };
    (status, value)
  }

  fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
  }

  // ── Schedule CRUD ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_entry_round_trips_date() {
    let app = router().await;

    let (status, created) = request(
      &app,
      "POST",
      "/schedule",
      Some(json!({ "date": "2025-12-25", "kind": "local" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["date"], "2025-12-25");

    let id = created["entry_id"].as_str().unwrap();
    let (status, fetched) =
      request(&app, "GET", &format!("/schedule/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["date"], "2025-12-25");
    assert_eq!(fetched["kind"], "local");
  }

  #[tokio::test]
  async fn create_normalises_timestamp_dates() {
    let app = router().await;

    // A stored-date signature (midnight UTC) must not drift a day.
    let (status, created) = request(
      &app,
      "POST",
      "/schedule",
      Some(json!({ "date": "2026-03-01T00:00:00Z", "kind": "received" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["date"], "2026-03-01");
  }

  #[tokio::test]
  async fn create_without_date_or_kind_is_rejected() {
    let app = router().await;

    let (status, body) =
      request(&app, "POST", "/schedule", Some(json!({ "kind": "local" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("date"));

    let (status, body) = request(
      &app,
      "POST",
      "/schedule",
      Some(json!({ "date": "2026-01-03" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("kind"));
  }

  #[tokio::test]
  async fn invalid_kind_is_rejected_at_the_boundary() {
    let app = router().await;
    let (status, _) = request(
      &app,
      "POST",
      "/schedule",
      Some(json!({ "date": "2026-01-03", "kind": "imported" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  }

  #[tokio::test]
  async fn get_missing_entry_is_404_and_delete_is_idempotent() {
    let app = router().await;
    let id = uuid::Uuid::new_v4();

    let (status, _) =
      request(&app, "GET", &format!("/schedule/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
      request(&app, "DELETE", &format!("/schedule/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }

  #[tokio::test]
  async fn multi_kind_filter_over_the_wire() {
    let app = router().await;
    for (date, kind) in [
      ("2026-01-03", "local"),
      ("2026-01-10", "sent"),
      ("2026-01-17", "received"),
    ] {
      let (status, _) = request(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "date": date, "kind": kind })),
      )
      .await;
      assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) =
      request(&app, "GET", "/schedule?kinds=sent,received", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    let kinds: Vec<_> = page["items"]
      .as_array()
      .unwrap()
      .iter()
      .map(|e| e["kind"].as_str().unwrap().to_owned())
      .collect();
    assert!(!kinds.contains(&"local".to_owned()));
  }

  #[tokio::test]
  async fn pagination_total_is_window_independent() {
    let app = router().await;
    for date in ["2026-01-03", "2026-01-10", "2026-01-17"] {
      request(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "date": date, "kind": "local" })),
      )
      .await;
    }

    let (_, page) =
      request(&app, "GET", "/schedule?limit=1&offset=0", None).await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["total"], 3);
  }

  // ── Two-phase confirmation ──────────────────────────────────────────────

  #[tokio::test]
  async fn recently_delivered_talk_requires_confirmation() {
    let app = router().await;

    let (_, talk) = request(
      &app,
      "POST",
      "/talks",
      Some(json!({ "number": 42, "topic": "Endurance" })),
    )
    .await;
    let talk_id = talk["talk_id"].as_str().unwrap().to_owned();

    let recent = (today() - Days::new(30)).to_string();
    let (status, _) = request(
      &app,
      "POST",
      "/schedule",
      Some(json!({ "date": recent, "kind": "local", "talk_id": talk_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Second booking without confirmation: structured 409.
    let (status, body) = request(
      &app,
      "POST",
      "/schedule",
      Some(json!({
        "date": today().to_string(),
        "kind": "local",
        "talk_id": talk_id,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["confirm_required"], true);
    let occurrences = body["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0]["source"], "active");
    assert_eq!(occurrences[0]["date"], recent);

    // Resubmit with confirm: created.
    let (status, _) = request(
      &app,
      "POST",
      "/schedule",
      Some(json!({
        "date": today().to_string(),
        "kind": "local",
        "talk_id": talk_id,
        "confirm": true,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  // ── Completion ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn completing_an_entry_archives_it_and_updates_the_speaker() {
    let app = router().await;

    let (_, talk) = request(
      &app,
      "POST",
      "/talks",
      Some(json!({ "number": 12, "topic": "Perseverance" })),
    )
    .await;
    let talk_id = talk["talk_id"].as_str().unwrap().to_owned();

    let (_, speaker) = request(
      &app,
      "POST",
      "/speakers",
      Some(json!({ "name": "Gawain" })),
    )
    .await;
    let speaker_id = speaker["speaker_id"].as_str().unwrap().to_owned();

    let (status, entry) = request(
      &app,
      "POST",
      "/schedule",
      Some(json!({
        "date": (today() - Days::new(2)).to_string(),
        "kind": "local",
        "talk_id": talk_id,
        "speaker_id": speaker_id,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let entry_id = entry["entry_id"].as_str().unwrap().to_owned();

    let (status, _) = request(
      &app,
      "POST",
      &format!("/schedule/{entry_id}/complete"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Gone from the active schedule.
    let (status, _) =
      request(&app, "GET", &format!("/schedule/{entry_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The speaker's outline list picked up the talk number.
    let (_, speaker) =
      request(&app, "GET", &format!("/speakers/{speaker_id}"), None).await;
    assert_eq!(speaker["outline_numbers"], json!([12]));

    // And the delivery shows up in the talk's history.
    let (_, history) =
      request(&app, "GET", &format!("/talks/{talk_id}/history"), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["speaker_name"], "Gawain");
  }

  #[tokio::test]
  async fn completing_a_missing_entry_is_404() {
    let app = router().await;
    let id = uuid::Uuid::new_v4();
    let (status, _) =
      request(&app, "POST", &format!("/schedule/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Gap weeks ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn full_weekend_coverage_reports_no_gaps() {
    let app = router().await;
    let (start, _) = gaps::window(today(), gaps::DEFAULT_WINDOW_WEEKS);

    for week in 0..5u64 {
      let saturday = start + Days::new(week * 7 + 5);
      let (status, _) = request(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "date": saturday.to_string(), "kind": "local" })),
      )
      .await;
      assert_eq!(status, StatusCode::CREATED);
    }

    let (status, gaps_body) =
      request(&app, "GET", "/schedule/gaps", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gaps_body, json!([]));
  }

  #[tokio::test]
  async fn sent_talks_do_not_cover_a_week() {
    let app = router().await;
    let (start, _) = gaps::window(today(), gaps::DEFAULT_WINDOW_WEEKS);

    // Cover every week except week 2, which only gets a sent talk.
    for week in 0..5u64 {
      let saturday = start + Days::new(week * 7 + 5);
      let kind = if week == 2 { "sent" } else { "local" };
      request(
        &app,
        "POST",
        "/schedule",
        Some(json!({ "date": saturday.to_string(), "kind": kind })),
      )
      .await;
    }

    let (_, body) = request(&app, "GET", "/schedule/gaps", None).await;
    let gaps_list = body.as_array().unwrap();
    assert_eq!(gaps_list.len(), 1);
    assert_eq!(
      gaps_list[0]["start"],
      (start + Days::new(14)).to_string()
    );
    assert_eq!(gaps_list[0]["end"], (start + Days::new(20)).to_string());
    assert!(
      gaps_list[0]["message"].as_str().unwrap().contains("no talk")
    );
  }

  // ── Arrangements ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn duplicate_arrangement_slot_is_409() {
    let app = router().await;

    let (status, _) = request(
      &app,
      "POST",
      "/arrangements",
      Some(json!({ "year": 2026, "month": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
      &app,
      "POST",
      "/arrangements",
      Some(json!({ "year": 2026, "month": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("2026-07"));
  }

  // ── Occurrences ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn occurrences_endpoint_reports_recent_bookings() {
    let app = router().await;

    let (_, talk) = request(
      &app,
      "POST",
      "/talks",
      Some(json!({ "number": 99, "topic": "Watchfulness" })),
    )
    .await;
    let talk_id = talk["talk_id"].as_str().unwrap().to_owned();

    request(
      &app,
      "POST",
      "/schedule",
      Some(json!({
        "date": (today() - Days::new(10)).to_string(),
        "kind": "local",
        "talk_id": talk_id,
      })),
    )
    .await;

    let (status, occurrences) = request(
      &app,
      "GET",
      &format!("/talks/{talk_id}/occurrences"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(occurrences.as_array().unwrap().len(), 1);
    assert_eq!(occurrences[0]["source"], "active");

    // A narrower window excludes it.
    let (_, occurrences) = request(
      &app,
      "GET",
      &format!("/talks/{talk_id}/occurrences?lookback_days=5"),
      None,
    )
    .await;
    assert_eq!(occurrences.as_array().unwrap().len(), 0);
  }
}
