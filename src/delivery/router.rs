use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use http::HeaderValue;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::catalog::builder::CatalogBuilder;
use crate::catalog::cache::CatalogCache;
use crate::core::config::AppConfig;
use crate::storage::signer::UrlSigner;
use crate::storage::ObjectStore;

use super::handlers;

// ---------------------------------------------------------------------------
// API router
// ---------------------------------------------------------------------------

/// Application state shared across all handlers, generic over the storage
/// backend (`S3ObjectStore` in production, `MemoryObjectStore` in tests and
/// local development).
pub struct AppState<S> {
    pub store: Arc<S>,
    pub signer: Arc<UrlSigner<S>>,
    pub cache: Arc<CatalogCache<S>>,
    /// Used by the single-course endpoint, which always rebuilds live.
    pub builder: Arc<CatalogBuilder<S>>,
    pub config: AppConfig,
    pub start_time: std::time::Instant,
    pub metrics_handle: PrometheusHandle,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            signer: self.signer.clone(),
            cache: self.cache.clone(),
            builder: self.builder.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
            metrics_handle: self.metrics_handle.clone(),
        }
    }
}

/// Build the full Axum router.
///
/// Route table:
/// - `GET  /api/courses`                         — full catalog (cached)
/// - `GET  /api/courses/{course_name}`           — one course, rebuilt live
/// - `GET  /api/vtt/{course_name}/{file_name}`   — subtitle proxy, raw VTT
/// - `GET  /api/srt/{course_name}/{file_name}`   — subtitle proxy, SRT→VTT
/// - `POST /api/signurl`                         — signed URL for one object
/// - `POST /api/clear-cache`                     — administrative
/// - `GET  /api/health`                          — cache/status report
/// - `GET  /healthz`                             — liveness probe
/// - `GET  /metrics`                             — Prometheus metrics (when
///   `observability.metrics_enabled` is set)
pub fn build_router<S: ObjectStore + 'static>(state: AppState<S>) -> Router {
    let cors = cors_layer(&state.config.delivery.cors_allowed_origins);

    let router = Router::new()
        .route("/api/courses", get(handlers::list_courses::<S>))
        .route(
            "/api/courses/{course_name}",
            get(handlers::get_course::<S>),
        )
        .route(
            "/api/vtt/{course_name}/{file_name}",
            get(handlers::serve_vtt::<S>),
        )
        .route(
            "/api/srt/{course_name}/{file_name}",
            get(handlers::serve_srt::<S>),
        )
        .route("/api/signurl", post(handlers::sign_object_url::<S>))
        .route("/api/clear-cache", post(handlers::clear_cache::<S>))
        .route("/api/health", get(handlers::health::<S>))
        .route("/healthz", get(handlers::healthz::<S>));

    let router = if state.config.observability.metrics_enabled {
        router.route("/metrics", get(handlers::metrics_handler::<S>))
    } else {
        router
    };

    router
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the browser client: the subtitle proxy in particular exists to
/// put permissive cross-origin headers on subtitle responses.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(86400));

    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
