//! HTTP Basic-auth middleware verifying against an argon2 PHC hash.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use std::sync::Arc;
use thiserror::Error;

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let mut res = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    res.headers_mut().insert(
      header::WWW_AUTHENTICATE,
      HeaderValue::from_static("Basic realm=\"rostrum\""),
    );
    res
  }
}

/// Verify credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash =
    PasswordHash::new(&config.password_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

/// Middleware layer: reject the request before it reaches the API unless
/// it carries valid credentials.
pub async fn require_auth(
  State(config): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Response {
  match verify_auth(req.headers(), &config) {
    Ok(()) => next.run(req).await,
    Err(e) => e.into_response(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config(password_hash: &str) -> AuthConfig {
    AuthConfig {
      username:      "user".to_string(),
      password_hash: password_hash.to_string(),
    }
  }

  fn hash(password: &str) -> String {
    use argon2::{PasswordHasher, password_hash::SaltString};
    use rand_core::OsRng;
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  fn basic(user: &str, pass: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let encoded = B64.encode(format!("{user}:{pass}"));
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
    );
    headers
  }

  #[test]
  fn correct_credentials() {
    let cfg = config(&hash("secret"));
    assert!(verify_auth(&basic("user", "secret"), &cfg).is_ok());
  }

  #[test]
  fn wrong_password() {
    let cfg = config(&hash("secret"));
    assert!(matches!(
      verify_auth(&basic("user", "wrong"), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn wrong_username() {
    let cfg = config(&hash("secret"));
    assert!(matches!(
      verify_auth(&basic("intruder", "secret"), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    let cfg = config(&hash("secret"));
    assert!(matches!(
      verify_auth(&HeaderMap::new(), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn invalid_base64() {
    let cfg = config(&hash("secret"));
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_static("Basic !!!not-base64!!!"),
    );
    assert!(matches!(
      verify_auth(&headers, &cfg),
      Err(Error::Unauthorized)
    ));
  }
}
