//! User registration and the authenticated profile.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use super::{
    Payload,
    auth::{AuthState, CurrentUser, hash_password, normalize_email, valid_email},
    internal_error, json_error, not_found, required,
};
use crate::store::StoreError;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserRegister {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserCreated {
    pub email: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body(content = UserRegister, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "User created", body = UserCreated),
        (status = 400, description = "Missing or invalid field, or email already registered"),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    Payload(request): Payload<UserRegister>,
) -> Response {
    let Some(email) = required(request.email) else {
        return json_error(StatusCode::BAD_REQUEST, "email missing");
    };
    // Passwords are kept verbatim, only emptiness is rejected.
    let Some(password) = request.password.filter(|password| !password.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "password missing");
    };

    let email = normalize_email(&email);
    if !valid_email(&email) {
        return json_error(StatusCode::BAD_REQUEST, "invalid email");
    }

    let password_hash = match hash_password(&password).await {
        Ok(hash) => hash,
        Err(err) => {
            error!("{err:#}");
            return internal_error();
        }
    };

    match auth_state.store().create_user(&email, &password_hash).await {
        Ok(user) => {
            info!("user {} created", user.id);
            let response = UserCreated {
                email: user.email,
                message: "user created".to_string(),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(StoreError::Conflict) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "email already registered" })),
        )
            .into_response(),
        Err(StoreError::Unavailable(err)) => {
            error!("Error inserting user: {err:#}");
            internal_error()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Profile of the session owner", body = MeResponse),
        (status = 403, description = "Missing, unknown or expired session"),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn me(
    auth_state: Extension<Arc<AuthState>>,
    CurrentUser(principal): CurrentUser,
) -> Response {
    match auth_state.store().find_user_by_id(principal.user_id).await {
        Ok(Some(user)) => {
            let response = MeResponse {
                id: user.id.to_string(),
                email: user.email,
                created_at: user.created_at.to_rfc3339(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to fetch profile: {err}");
            internal_error()
        }
    }
}
