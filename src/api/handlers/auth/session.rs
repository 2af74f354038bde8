//! Session endpoints and cookie handling.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::{
    state::{AuthConfig, AuthState},
    types::{LoginRequest, LoginResponse},
    utils::{generate_session_token, hash_token, normalize_email, verify_password},
};
use crate::{
    api::handlers::{Payload, internal_error, json_error, not_found, required},
    store::{SessionRecord, StoreError},
};

const SESSION_INSERT_ATTEMPTS: usize = 3;

#[utoipa::path(
    post,
    path = "/api/v1/auth_session/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Logged in, session cookie set", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "No user found for this email"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    Payload(request): Payload<LoginRequest>,
) -> Response {
    let Some(email) = required(request.email) else {
        return json_error(StatusCode::BAD_REQUEST, "email missing");
    };
    let Some(password) = request.password.filter(|password| !password.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "password missing");
    };
    let email = normalize_email(&email);

    let user = match auth_state.store().find_user_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return json_error(StatusCode::NOT_FOUND, "no user found for this email");
        }
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return internal_error();
        }
    };

    match verify_password(&password, &user.password_hash).await {
        Ok(true) => {}
        Ok(false) => {
            debug!("wrong password for {}", user.id);
            return json_error(StatusCode::UNAUTHORIZED, "wrong password");
        }
        Err(err) => {
            error!("Failed to verify password: {err}");
            return internal_error();
        }
    }

    let token = match create_session(&auth_state, user.id).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to create session: {err}");
            return internal_error();
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(auth_state.config(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return internal_error();
        }
    }

    let response = LoginResponse {
        id: user.id.to_string(),
        email: user.email,
    };
    (StatusCode::OK, headers, Json(response)).into_response()
}

#[utoipa::path(
    delete,
    path = "/api/v1/auth_session/logout",
    responses(
        (status = 200, description = "Session destroyed and cookie cleared"),
        (status = 403, description = "Missing, unknown or expired session"),
        (status = 404, description = "No session to destroy"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    // Expired sessions are removed by the lookup and count as absent.
    match authenticate_session(&headers, &auth_state).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(),
        Err(_) => return internal_error(),
    }
    let Some(token) = extract_session_token(&headers, auth_state.config().session_name()) else {
        return not_found();
    };

    match auth_state.store().delete_session(&hash_token(&token)).await {
        Ok(true) => {}
        Ok(false) => return not_found(),
        Err(err) => {
            error!("Failed to delete session: {err}");
            return internal_error();
        }
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::OK, response_headers, Json(json!({}))).into_response()
}

/// Create a session for a user and return the raw session id.
///
/// Retries on the unlikely event of a hash collision.
pub(crate) async fn create_session(
    auth_state: &AuthState,
    user_id: uuid::Uuid,
) -> anyhow::Result<String> {
    for _ in 0..SESSION_INSERT_ATTEMPTS {
        let token = generate_session_token()?;
        match auth_state
            .store()
            .insert_session(&hash_token(&token), user_id)
            .await
        {
            Ok(()) => return Ok(token),
            Err(StoreError::Conflict) => {}
            Err(StoreError::Unavailable(err)) => return Err(err),
        }
    }

    Err(anyhow::anyhow!("failed to generate unique session token"))
}

/// Resolve a session cookie into a live session record.
///
/// Returns `Ok(None)` when the cookie is missing, unknown, or expired.
/// Expired sessions are deleted on the way out.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<Option<SessionRecord>, StatusCode> {
    let Some(token) = extract_session_token(headers, auth_state.config().session_name()) else {
        return Ok(None);
    };
    let token_hash = hash_token(&token);

    let record = match auth_state.store().lookup_session(&token_hash).await {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(None),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let ttl_seconds = auth_state.config().session_ttl_seconds();
    if is_expired(record.created_at, ttl_seconds, Utc::now()) {
        debug!("session for {} expired", record.user_id);
        if let Err(err) = auth_state.store().delete_session(&token_hash).await {
            error!("Failed to delete expired session: {err}");
        }
        return Ok(None);
    }

    Ok(Some(record))
}

/// A session created at `created_at` is expired once `created_at + ttl` is in
/// the past. A non-positive TTL never expires.
pub(crate) fn is_expired(created_at: DateTime<Utc>, ttl_seconds: i64, now: DateTime<Utc>) -> bool {
    if ttl_seconds <= 0 {
        return false;
    }
    Duration::try_seconds(ttl_seconds)
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .is_some_and(|expires_at| expires_at < now)
}

/// Build an `HttpOnly` cookie for the session id.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = config.session_name();
    let mut cookie = format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax");
    let ttl_seconds = config.session_ttl_seconds();
    if ttl_seconds > 0 {
        cookie.push_str(&format!("; Max-Age={ttl_seconds}"));
    }
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = config.session_name();
    let mut cookie = format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read the named session cookie; empty values count as missing.
pub(crate) fn extract_session_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            Some((parts.next()?.trim(), parts.next()?.trim()))
        })
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
