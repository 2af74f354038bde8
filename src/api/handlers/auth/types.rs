//! Request and response payloads for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ResetTokenRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetTokenResponse {
    pub email: String,
    pub reset_token: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub email: Option<String>,
    pub reset_token: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePasswordResponse {
    pub email: String,
    pub message: String,
}
