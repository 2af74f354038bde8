//! Password reset via a one-time token.
//!
//! Flow Overview:
//! 1) `POST` issues a fresh token for a known email; only its hash is stored.
//! 2) `PUT` presents the token with a new password. A matching token is
//!    consumed, the password is rehashed, and every session of the user is
//!    revoked.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{
    state::AuthState,
    types::{ResetTokenRequest, ResetTokenResponse, UpdatePasswordRequest, UpdatePasswordResponse},
    utils::{generate_reset_token, hash_password, hash_token, normalize_email},
};
use crate::api::handlers::{Payload, forbidden, internal_error, json_error, required};

#[utoipa::path(
    post,
    path = "/api/v1/reset_password",
    request_body(content = ResetTokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Reset token issued", body = ResetTokenResponse),
        (status = 400, description = "Email missing"),
        (status = 403, description = "Unknown email"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn get_reset_password_token(
    auth_state: Extension<Arc<AuthState>>,
    Payload(request): Payload<ResetTokenRequest>,
) -> Response {
    let Some(email) = required(request.email) else {
        return json_error(StatusCode::BAD_REQUEST, "email missing");
    };
    let email = normalize_email(&email);

    let user = match auth_state.store().find_user_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => return forbidden(),
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return internal_error();
        }
    };

    let token = match generate_reset_token() {
        Ok(token) => token,
        Err(err) => {
            error!("{err:#}");
            return internal_error();
        }
    };

    if let Err(err) = auth_state
        .store()
        .set_reset_token(user.id, &hash_token(&token))
        .await
    {
        error!("Failed to store reset token: {err}");
        return internal_error();
    }

    info!("reset token issued for {}", user.id);

    let response = ResetTokenResponse {
        email: user.email,
        reset_token: token,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    put,
    path = "/api/v1/reset_password",
    request_body(content = UpdatePasswordRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Password updated", body = UpdatePasswordResponse),
        (status = 400, description = "Email, reset token or new password missing"),
        (status = 403, description = "Unknown email or invalid reset token"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn update_password(
    auth_state: Extension<Arc<AuthState>>,
    Payload(request): Payload<UpdatePasswordRequest>,
) -> Response {
    let Some(email) = required(request.email) else {
        return json_error(StatusCode::BAD_REQUEST, "email missing");
    };
    let Some(reset_token) = required(request.reset_token) else {
        return json_error(StatusCode::BAD_REQUEST, "reset_token missing");
    };
    let Some(new_password) = request.new_password.filter(|password| !password.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "new_password missing");
    };
    let email = normalize_email(&email);

    let user = match auth_state.store().find_user_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => return forbidden(),
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return internal_error();
        }
    };

    let password_hash = match hash_password(&new_password).await {
        Ok(hash) => hash,
        Err(err) => {
            error!("{err:#}");
            return internal_error();
        }
    };

    match auth_state
        .store()
        .consume_reset_token(user.id, &hash_token(&reset_token), &password_hash)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!("invalid reset token for {}", user.id);
            return forbidden();
        }
        Err(err) => {
            error!("Failed to update password: {err}");
            return internal_error();
        }
    }

    match auth_state.store().delete_user_sessions(user.id).await {
        Ok(revoked) => info!("password updated for {}, {revoked} sessions revoked", user.id),
        Err(err) => error!("Failed to revoke sessions after password update: {err}"),
    }

    let response = UpdatePasswordResponse {
        email: user.email,
        message: "Password updated".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
