//! HTTP server assembly for Rostrum.
//!
//! Mounts the JSON API under `/api`, behind HTTP Basic authentication and
//! request tracing.

pub mod auth;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use rostrum_core::store::ScheduleStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router for `store`.
pub fn router<S>(store: Arc<S>, auth: Arc<AuthConfig>) -> Router
where
  S: ScheduleStore + 'static,
{
  Router::new()
    .nest("/api", rostrum_api::api_router(store))
    .layer(middleware::from_fn_with_state(auth, auth::require_auth))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use rand_core::OsRng;
  use rostrum_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  async fn app(password: &str) -> Router {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    router(
      store,
      Arc::new(AuthConfig {
        username:      "user".to_string(),
        password_hash: hash,
      }),
    )
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[tokio::test]
  async fn unauthenticated_requests_are_401() {
    let app = app("secret").await;
    let resp = app
      .oneshot(Request::builder().uri("/api/talks").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn authenticated_requests_reach_the_api() {
    let app = app("secret").await;
    let resp = app
      .oneshot(
        Request::builder()
          .uri("/api/talks")
          .header(header::AUTHORIZATION, basic("user", "secret"))
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn wrong_credentials_are_401() {
    let app = app("secret").await;
    let resp = app
      .oneshot(
        Request::builder()
          .uri("/api/talks")
          .header(header::AUTHORIZATION, basic("user", "nope"))
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }
}
