//! Request principal resolution and the global session guard.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use super::{session::authenticate_session, state::AuthState};
use crate::api::handlers::{forbidden, internal_error};

/// The user behind a valid session cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

/// Whether `path` needs an authenticated session.
///
/// Paths and patterns are compared with a trailing slash; a pattern ending in
/// `*` matches every path sharing its prefix.
#[must_use]
pub fn require_auth(path: Option<&str>, excluded_paths: &[String]) -> bool {
    let Some(path) = path.filter(|path| !path.is_empty()) else {
        return true;
    };
    if excluded_paths.is_empty() {
        return true;
    }

    let path = with_trailing_slash(path);
    !excluded_paths.iter().any(|pattern| {
        if let Some(prefix) = pattern.strip_suffix('*') {
            path.starts_with(prefix)
        } else {
            path == with_trailing_slash(pattern)
        }
    })
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Resolve the principal for a request, reusing one the guard already found.
///
/// Missing, unknown and expired sessions all yield `Ok(None)`.
pub(crate) async fn resolve_principal(parts: &Parts) -> Result<Option<Principal>, Response> {
    if let Some(principal) = parts.extensions.get::<Principal>() {
        return Ok(Some(principal.clone()));
    }

    let Some(auth_state) = parts.extensions.get::<Arc<AuthState>>() else {
        error!("AuthState extension missing");
        return Err(internal_error());
    };

    authenticate_session(&parts.headers, auth_state)
        .await
        .map(|record| {
            record.map(|record| Principal {
                user_id: record.user_id,
                email: record.email,
            })
        })
        .map_err(|_| internal_error())
}

/// Extractor rejecting requests without a live session with `403`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match resolve_principal(parts).await? {
            Some(principal) => Ok(Self(principal)),
            None => Err(forbidden()),
        }
    }
}

/// Middleware enforcing a session on every path outside the excluded list.
///
/// Does nothing when the auth type is `none`. A resolved principal is stored in
/// the request extensions for handlers.
pub async fn auth_guard(request: Request, next: Next) -> Response {
    let Some(auth_state) = request.extensions().get::<Arc<AuthState>>().cloned() else {
        error!("AuthState extension missing");
        return internal_error();
    };

    let config = auth_state.config();
    if !config.auth_type().guards_requests()
        || !require_auth(Some(request.uri().path()), config.excluded_paths())
    {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    match resolve_principal(&parts).await {
        Ok(Some(principal)) => {
            parts.extensions.insert(principal);
            next.run(Request::from_parts(parts, body)).await
        }
        Ok(None) => {
            debug!("rejecting {} without a valid session", parts.uri.path());
            forbidden()
        }
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthConfig;

    fn excluded() -> Vec<String> {
        vec![
            "/api/v1/status/".to_string(),
            "/api/v1/stat*".to_string(),
        ]
    }

    #[test]
    fn require_auth_without_path_or_exclusions() {
        assert!(require_auth(None, &excluded()));
        assert!(require_auth(Some(""), &excluded()));
        assert!(require_auth(Some("/api/v1/status"), &[]));
    }

    #[test]
    fn require_auth_is_slash_tolerant() {
        let excluded = vec!["/api/v1/status/".to_string(), "/api/v1/users".to_string()];
        assert!(!require_auth(Some("/api/v1/status"), &excluded));
        assert!(!require_auth(Some("/api/v1/status/"), &excluded));
        assert!(!require_auth(Some("/api/v1/users/"), &excluded));
        assert!(require_auth(Some("/api/v1/users/me"), &excluded));
    }

    #[test]
    fn require_auth_wildcard_matches_prefix() {
        assert!(!require_auth(Some("/api/v1/stats"), &excluded()));
        assert!(!require_auth(Some("/api/v1/stat"), &excluded()));
        assert!(require_auth(Some("/api/v1/users"), &excluded()));
    }

    #[test]
    fn default_exclusions_leave_profile_protected() {
        let config = AuthConfig::new();
        let excluded = config.excluded_paths();
        for public in [
            "/",
            "/health",
            "/openapi.json",
            "/api/v1/status",
            "/api/v1/users",
            "/api/v1/auth_session/login",
            "/api/v1/reset_password",
        ] {
            assert!(!require_auth(Some(public), excluded), "{public}");
        }
        assert!(require_auth(Some("/api/v1/users/me"), excluded));
        assert!(require_auth(Some("/api/v1/auth_session/logout"), excluded));
        assert!(require_auth(Some("/api/v1/unknown"), excluded));
    }
}
