use crate::{
    bucket::ImageBucket,
    catalog::{Catalog, postgres::PgCatalog},
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub(crate) mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use handlers::admin::{AdminGate, GateError};
pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Everything the handlers receive through `Extension` layers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub gate: Arc<AdminGate>,
    pub bucket: Arc<dyn ImageBucket>,
    pub upload_max_bytes: usize,
}

/// Assemble the served application: documented routes, request ids, tracing
/// and the injected state.
#[must_use]
pub fn app(state: AppState) -> Router {
    let (router, _openapi) = router().split_for_parts();
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(DefaultBodyLimit::max(state.upload_max_bytes))
            .layer(Extension(state.catalog))
            .layer(Extension(state.gate))
            .layer(Extension(state.bucket)),
    )
}

/// Start the server
/// # Errors
/// Return error if the database is unreachable, the schema cannot be applied
/// or the listener fails
pub async fn new(
    port: u16,
    dsn: &str,
    gate: AdminGate,
    bucket: Arc<dyn ImageBucket>,
    upload_max_bytes: usize,
) -> Result<()> {
    let store = PgCatalog::connect(dsn).await?;
    store
        .apply_schema()
        .await
        .context("Failed to apply catalog schema")?;

    let app = app(AppState {
        catalog: Arc::new(store),
        gate: Arc::new(gate),
        bucket,
        upload_max_bytes,
    });

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
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
