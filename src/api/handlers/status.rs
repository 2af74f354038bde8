use axum::{Json, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Status {
    status: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "API is up", body = Status),
    ),
    tag = "status"
)]
pub async fn status() -> impl IntoResponse {
    Json(Status {
        status: "OK".to_string(),
    })
}
