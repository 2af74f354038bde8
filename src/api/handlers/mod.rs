//! API handlers and shared utilities.
//!
//! Request bodies are accepted either as `application/json` or as
//! url-encoded forms, and every error is answered with a JSON object of the
//! shape `{"error": "..."}`.

pub mod auth;
pub mod health;
pub mod status;
pub mod users;

use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// JSON error body with the given status.
pub(crate) fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn forbidden() -> Response {
    json_error(StatusCode::FORBIDDEN, "Forbidden")
}

pub(crate) fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not found")
}

pub(crate) fn internal_error() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Router fallback for unknown paths.
pub async fn fallback() -> Response {
    not_found()
}

/// Trim a submitted field, treating blank values as missing.
pub(crate) fn required(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Body extractor accepting JSON or url-encoded forms.
///
/// A request without a `Content-Type` yields `T::default()`, so handlers can
/// report which field is missing instead of a media type error.
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase);

        match content_type {
            None => Ok(Self(T::default())),
            Some(value) if value.starts_with("application/json") => {
                Json::<T>::from_request(req, state)
                    .await
                    .map(|Json(payload)| Self(payload))
                    .map_err(|rejection| json_error(rejection.status(), &rejection.body_text()))
            }
            Some(_) => Form::<T>::from_request(req, state)
                .await
                .map(|Form(payload)| Self(payload))
                .map_err(|rejection| json_error(rejection.status(), &rejection.body_text())),
        }
    }
}
