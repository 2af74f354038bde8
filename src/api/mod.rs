use crate::api::handlers::{auth::auth_guard, fallback};
use anyhow::Result;
use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub(crate) mod handlers;
mod openapi;

pub use handlers::auth::{AuthConfig, AuthState, AuthType, DEFAULT_SESSION_NAME};
pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the full application: documented routes, `/openapi.json`, the
/// JSON 404 fallback, request ids, tracing, and the session guard.
#[must_use]
pub fn app(auth_state: Arc<AuthState>) -> Router {
    let (router, openapi) = router().split_for_parts();

    router
        .route(
            "/openapi.json",
            get(move || {
                let openapi = openapi.clone();
                async move { Json(openapi) }
            }),
        )
        .fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state))
                .layer(middleware::from_fn(auth_guard)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(host: &str, port: u16, auth_state: Arc<AuthState>) -> Result<()> {
    info!(
        "auth type: {}, store: {}",
        auth_state.config().auth_type(),
        auth_state.store().backend()
    );

    let app = app(auth_state);

    let listener = TcpListener::bind((host, port)).await?;

    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Gracefully shutdown"),
                Err(err) => {
                    error!("Failed to listen for shutdown signal: {err}");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
