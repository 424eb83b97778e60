//! Signed-cookie sessions.
//!
//! The cookie value is `base64(claims).base64(hmac)` over a server-side
//! secret; tampering or expiry makes the request anonymous rather than
//! failing it.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::entities::UserRecord;

use super::HttpState;

pub const SESSION_COOKIE: &str = "piazza_session";

const SESSION_TTL: Duration = Duration::days(14);

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session token could not be produced")]
    Signing,
}

/// HMAC key derived from the configured session secret.
#[derive(Clone)]
pub struct SessionKey {
    key: Vec<u8>,
}

impl SessionKey {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| SessionError::Signing)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    user_id: Uuid,
    #[serde(with = "time::serde::timestamp")]
    expires_at: OffsetDateTime,
}

pub fn issue_token(
    key: &SessionKey,
    user_id: Uuid,
    now: OffsetDateTime,
) -> Result<String, SessionError> {
    let claims = SessionClaims {
        user_id,
        expires_at: now + SESSION_TTL,
    };
    let payload = serde_json::to_vec(&claims).map_err(|_| SessionError::Signing)?;
    let encoded = URL_SAFE_NO_PAD.encode(&payload);

    let mut mac = key.mac()?;
    mac.update(encoded.as_bytes());
    let tag = mac.finalize().into_bytes();

    Ok(format!("{encoded}.{}", URL_SAFE_NO_PAD.encode(tag)))
}

/// Recover the user id from a presented token. Any defect (bad shape,
/// bad signature, expired claims) yields `None`.
pub fn authenticate_token(key: &SessionKey, token: &str, now: OffsetDateTime) -> Option<Uuid> {
    let (encoded, tag) = token.split_once('.')?;
    let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;

    let mut mac = key.mac().ok()?;
    mac.update(encoded.as_bytes());
    mac.verify_slice(&tag).ok()?;

    let payload = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;

    (claims.expires_at > now).then_some(claims.user_id)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    cookie
}

/// Resolve the authenticated user for this request, if any. A stale
/// cookie pointing at a deleted user is treated as anonymous.
pub async fn resolve_viewer(
    state: &HttpState,
    jar: &CookieJar,
) -> Result<Option<UserRecord>, RepoError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let Some(user_id) =
        authenticate_token(&state.sessions, cookie.value(), OffsetDateTime::now_utc())
    else {
        return Ok(None);
    };
    state.users.find_by_id(user_id).await
}
