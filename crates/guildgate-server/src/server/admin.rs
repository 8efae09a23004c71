//! Operator authentication: HTTP Basic credentials checked against an
//! argon2id hash.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::prelude::*;
use tracing::warn;

use super::AppState;

const CHALLENGE: &str = r#"Basic realm="guildgate operator", charset="UTF-8""#;

/// Hash a password using argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Operator credentials the server accepts.
#[derive(Clone)]
pub struct OperatorAuth {
    username: String,
    password_hash: Option<String>,
}

impl std::fmt::Debug for OperatorAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorAuth")
            .field("username", &self.username)
            .field("enabled", &self.password_hash.is_some())
            .finish()
    }
}

impl OperatorAuth {
    pub fn new(username: &str, password_hash: Option<&str>) -> Self {
        Self {
            username: username.to_string(),
            password_hash: password_hash
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Check an `Authorization` header.
    async fn check(&self, headers: &HeaderMap) -> bool {
        let Some(hash) = self.password_hash.clone() else {
            return false;
        };
        let Some((user, password)) = basic_credentials(headers) else {
            return false;
        };
        if user != self.username {
            return false;
        }

        // Hashing blocks; run it off the async workers.
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await;
        match verified {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => {
                warn!(error = %e, "Configured operator password hash is invalid");
                false
            }
            Err(e) => {
                warn!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

/// Decode `Authorization: Basic <base64(user:password)>`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, password) = text.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Middleware guarding operator routes.
///
/// 403 while no operator password is configured, 401 with a Basic challenge
/// for missing or wrong credentials.
pub async fn require_operator(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let auth = state.operator();
    if !auth.is_enabled() {
        return (StatusCode::FORBIDDEN, "Operator access is not configured\n").into_response();
    }
    let headers = request.headers().clone();
    if !auth.check(&headers).await {
        warn!(path = %request.uri().path(), "Rejected operator credentials");
        return (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, CHALLENGE)],
            "Operator credentials required\n",
        )
            .into_response();
    }
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn basic(user: &str, password: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let token = BASE64_STANDARD.encode(format!("{user}:{password}"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("mysecret").unwrap();
        assert!(verify_password("mysecret", &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn decodes_basic_credentials() {
        let (user, password) = basic_credentials(&basic("admin", "p:ss")).unwrap();
        assert_eq!(user, "admin");
        assert_eq!(password, "p:ss");
    }

    #[test]
    fn rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(basic_credentials(&headers).is_none());
        assert!(basic_credentials(&HeaderMap::new()).is_none());
    }

    #[tokio::test]
    async fn checks_username_and_password() {
        let hash = hash_password("hunter2").unwrap();
        let auth = OperatorAuth::new("admin", Some(&hash));
        assert!(auth.check(&basic("admin", "hunter2")).await);
        assert!(!auth.check(&basic("admin", "wrong")).await);
        assert!(!auth.check(&basic("root", "hunter2")).await);
    }

    #[tokio::test]
    async fn disabled_without_hash() {
        let auth = OperatorAuth::new("admin", Some("  "));
        assert!(!auth.is_enabled());
        assert!(!auth.check(&basic("admin", "anything")).await);
    }
}
