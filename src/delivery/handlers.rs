use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::core::error::DeliveryError;
use crate::observability::metrics as obs;
use crate::storage::{GetObjectOutput, ObjectStore};
use crate::subtitle::{self, SubtitleFormat};

use super::router::AppState;

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(err: DeliveryError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorBody {
        error: err.error_code(),
        message: err.to_string(),
    };
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Catalog endpoints
// ---------------------------------------------------------------------------

/// `GET /api/courses` — the full catalog, served from the TTL cache.
pub async fn list_courses<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    obs::inc_delivery_request("courses");
    match state.cache.get_courses().await {
        Ok(courses) => Json(&*courses).into_response(),
        Err(e) => {
            warn!(error = %e, "catalog request failed");
            error_response(DeliveryError::CatalogUnavailable {
                reason: e.to_string(),
            })
        }
    }
}

/// `GET /api/courses/{course_name}` — one course, always rebuilt live so a
/// freshly uploaded asset shows up without waiting out the catalog TTL.
pub async fn get_course<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Path(course_name): Path<String>,
) -> Response {
    obs::inc_delivery_request("course");
    match state.builder.build_course(&course_name).await {
        Ok(course) => Json(course).into_response(),
        Err(e) => {
            warn!(course = %course_name, error = %e, "single-course build failed");
            error_response(DeliveryError::CatalogUnavailable {
                reason: e.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Subtitle proxy
// ---------------------------------------------------------------------------

/// Folder spellings probed for each subtitle format, in order. Buckets are
/// not consistent about casing, and some keep both formats in a shared
/// `Subtitles/` or `subs/` folder.
const VTT_FOLDER_CANDIDATES: [&str; 5] = ["vtt", "Vtt", "VTT", "Subtitles", "subs"];
const SRT_FOLDER_CANDIDATES: [&str; 5] = ["srt", "Srt", "SRT", "Subtitles", "subs"];

/// Try each candidate folder until one GET succeeds. Any failure, including
/// transient storage errors, just moves on to the next candidate.
async fn probe_subtitle<S: ObjectStore>(
    store: &S,
    course: &str,
    file: &str,
    candidates: &[&str],
) -> Option<GetObjectOutput> {
    for folder in candidates {
        let path = format!("{}/{}/{}", course, folder, file);
        match store.get_object(&path).await {
            Ok(output) => {
                debug!(%path, "subtitle found");
                return Some(output);
            }
            Err(e) => {
                debug!(%path, error = %e, "subtitle probe miss");
            }
        }
    }
    None
}

fn vtt_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/vtt")], body).into_response()
}

/// `GET /api/vtt/{course_name}/{file_name}` — serve a VTT subtitle verbatim,
/// with CORS headers the storage host will not provide.
pub async fn serve_vtt<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Path((course_name, file_name)): Path<(String, String)>,
) -> Response {
    obs::inc_subtitle_request("vtt");
    match probe_subtitle(
        state.store.as_ref(),
        &course_name,
        &file_name,
        &VTT_FOLDER_CANDIDATES,
    )
    .await
    {
        Some(output) => {
            let text = String::from_utf8_lossy(&output.body).into_owned();
            vtt_response(subtitle::to_vtt(SubtitleFormat::Vtt, &text))
        }
        None => error_response(DeliveryError::SubtitleNotFound {
            course: course_name,
            file: file_name,
        }),
    }
}

/// `GET /api/srt/{course_name}/{file_name}` — fetch an SRT subtitle and
/// convert it to VTT on the way out.
pub async fn serve_srt<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Path((course_name, file_name)): Path<(String, String)>,
) -> Response {
    obs::inc_subtitle_request("srt");
    match probe_subtitle(
        state.store.as_ref(),
        &course_name,
        &file_name,
        &SRT_FOLDER_CANDIDATES,
    )
    .await
    {
        Some(output) => {
            let text = String::from_utf8_lossy(&output.body).into_owned();
            vtt_response(subtitle::to_vtt(SubtitleFormat::Srt, &text))
        }
        None => error_response(DeliveryError::SubtitleNotFound {
            course: course_name,
            file: file_name,
        }),
    }
}

// ---------------------------------------------------------------------------
// Signed URLs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUrlRequest {
    #[serde(default)]
    object_key: Option<String>,
}

/// `POST /api/signurl` — sign an arbitrary object key on demand. Keys arrive
/// from URL-encoded contexts, so `+` is restored to a space before signing.
pub async fn sign_object_url<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Json(request): Json<SignUrlRequest>,
) -> Response {
    obs::inc_delivery_request("signurl");
    let Some(object_key) = request.object_key else {
        return error_response(DeliveryError::MissingObjectKey);
    };

    let object_key = object_key.replace('+', " ");
    match state
        .signer
        .sign(&object_key, state.config.catalog.sign_expiry_secs)
        .await
    {
        Ok(url) => Json(json!({ "url": url })).into_response(),
        Err(e) => {
            warn!(key = %object_key, error = %e, "on-demand signing failed");
            error_response(DeliveryError::SigningFailed {
                reason: e.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Administration and health
// ---------------------------------------------------------------------------

/// `POST /api/clear-cache` — drop the catalog cache and every issued URL.
pub async fn clear_cache<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    obs::inc_delivery_request("clear_cache");
    state.cache.clear();
    info!("cache cleared by request");
    Json(json!({ "message": "Cache cleared successfully" })).into_response()
}

/// `GET /api/health` — operational status: cache lifecycle, URL cache size,
/// and whether a rebuild is running.
pub async fn health<S: ObjectStore + 'static>(State(state): State<AppState<S>>) -> Response {
    Json(json!({
        "status": "OK",
        "bucket": state.config.storage.bucket,
        "region": state.config.storage.region,
        "cacheStatus": state.cache.state().as_str(),
        "urlCacheSize": state.signer.entry_count(),
        "isBuilding": state.cache.is_building(),
    }))
    .into_response()
}

/// `GET /healthz` — liveness probe.
pub async fn healthz<S: ObjectStore + 'static>(State(state): State<AppState<S>>) -> Response {
    Json(json!({
        "status": "ok",
        "uptimeSecs": state.start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// `GET /metrics` — Prometheus exposition.
pub async fn metrics_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.metrics_handle.render(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builder::CatalogBuilder;
    use crate::catalog::cache::CatalogCache;
    use crate::core::config::{
        AppConfig, CatalogConfig, DeliveryConfig, ObservabilityConfig, ServerConfig, StorageConfig,
    };
    use crate::delivery::router::build_router;
    use crate::storage::memory::MemoryObjectStore;
    use crate::storage::signer::UrlSigner;

    use axum::body::Body;
    use axum::Router;
    use bytes::Bytes;
    use http::Request;
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
                public_base_url: "http://localhost:3001".to_string(),
            },
            storage: StorageConfig {
                backend: "memory".to_string(),
                endpoint: String::new(),
                bucket: "course-media".to_string(),
                access_key_id: String::new(),
                secret_access_key: String::new(),
                region: "us-east-1".to_string(),
                path_style: false,
            },
            catalog: CatalogConfig {
                cache_ttl_secs: 1800,
                sign_expiry_secs: 3600,
                pregen_sign_expiry_secs: 86400,
                snapshot_path: "pre-generated-urls.json".to_string(),
            },
            delivery: DeliveryConfig {
                cors_allowed_origins: vec!["*".to_string()],
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: "pretty".to_string(),
                metrics_enabled: true,
            },
        }
    }

    fn app_over(store: Arc<MemoryObjectStore>) -> Router {
        app_with_config(store, test_config())
    }

    fn app_with_config(store: Arc<MemoryObjectStore>, config: AppConfig) -> Router {
        let signer = Arc::new(UrlSigner::new(store.clone()));
        let builder = Arc::new(CatalogBuilder::new(
            store.clone(),
            signer.clone(),
            config.server.public_base_url.clone(),
            config.catalog.sign_expiry_secs,
        ));
        let cache_builder = CatalogBuilder::new(
            store.clone(),
            signer.clone(),
            config.server.public_base_url.clone(),
            config.catalog.sign_expiry_secs,
        );
        let cache = Arc::new(CatalogCache::new(
            cache_builder,
            signer.clone(),
            Duration::from_secs(config.catalog.cache_ttl_secs),
        ));
        let state = AppState {
            store,
            signer,
            cache,
            builder,
            config,
            start_time: std::time::Instant::now(),
            metrics_handle: PrometheusBuilder::new().build_recorder().handle(),
        };
        build_router(state)
    }

    async fn seeded_store() -> Arc<MemoryObjectStore> {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .put_object(
                "Physics/video/intro.mp4",
                Bytes::from("mp4-bytes"),
                "video/mp4",
            )
            .await;
        store
            .put_object(
                "Physics/vtt/intro.en.vtt",
                Bytes::from("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHello\n"),
                "text/vtt",
            )
            .await;
        store
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn courses_endpoint_serves_catalog() {
        let app = app_over(seeded_store().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/courses")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Physics");
        assert_eq!(json[0]["videos"][0]["name"], "intro");
        assert!(json[0]["videos"][0]["vttUrls"]["en"]
            .as_str()
            .unwrap()
            .ends_with("/api/vtt/Physics/intro.en.vtt"));
    }

    #[tokio::test]
    async fn single_course_endpoint_builds_live() {
        let store = seeded_store().await;
        let app = app_over(store.clone());

        // Upload after the router exists; the live endpoint sees it anyway.
        store
            .put_object(
                "Physics/video/waves.mp4",
                Bytes::from("mp4"),
                "video/mp4",
            )
            .await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/courses/Physics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["videos"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn vtt_proxy_probes_folder_casings() {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .put_object(
                "Chemistry/VTT/lab.en.vtt",
                Bytes::from("WEBVTT\n\ncue\n"),
                "text/vtt",
            )
            .await;
        let app = app_over(store);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/vtt/Chemistry/lab.en.vtt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/vtt"
        );
        let text = body_text(response).await;
        assert!(text.starts_with("WEBVTT"));
    }

    #[tokio::test]
    async fn srt_proxy_converts_to_vtt() {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .put_object(
                "Chemistry/srt/lab.en.srt",
                Bytes::from("1\n00:00:01,000 --> 00:00:02,500\nTitration\n"),
                "application/x-subrip",
            )
            .await;
        let app = app_over(store);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/srt/Chemistry/lab.en.srt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.starts_with("WEBVTT\n\n"));
        assert!(text.contains("00:00:01.000 --> 00:00:02.500"));
        assert!(text.contains("Titration"));
    }

    #[tokio::test]
    async fn missing_subtitle_is_not_found() {
        let app = app_over(Arc::new(MemoryObjectStore::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/vtt/Nope/missing.en.vtt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "subtitle_not_found");
    }

    #[tokio::test]
    async fn signurl_restores_spaces_from_plus() {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .put_object(
                "Physics/video/wave motion.mp4",
                Bytes::from("mp4"),
                "video/mp4",
            )
            .await;
        let app = app_over(store);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/signurl")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"objectKey":"Physics/video/wave+motion.mp4"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["url"]
            .as_str()
            .unwrap()
            .contains("Physics/video/wave motion.mp4"));
    }

    #[tokio::test]
    async fn signurl_without_key_is_bad_request() {
        let app = app_over(Arc::new(MemoryObjectStore::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/signurl")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "missing_object_key");
    }

    #[tokio::test]
    async fn signurl_for_missing_object_is_bad_gateway() {
        let app = app_over(Arc::new(MemoryObjectStore::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/signurl")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"objectKey":"no/such/object.mp4"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "signing_failed");
    }

    #[tokio::test]
    async fn clear_cache_empties_catalog_state() {
        let store = seeded_store().await;
        let app = app_over(store);

        // Warm the cache.
        app.clone()
            .oneshot(
                Request::builder()
                    .uri("/api/courses")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/clear-cache")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(health).await;
        assert_eq!(json["cacheStatus"], "empty");
        assert_eq!(json["urlCacheSize"], 0);
    }

    #[tokio::test]
    async fn health_reports_cache_and_bucket() {
        let app = app_over(seeded_store().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "OK");
        assert_eq!(json["bucket"], "course-media");
        assert_eq!(json["cacheStatus"], "empty");
        assert_eq!(json["isBuilding"], false);
    }

    #[tokio::test]
    async fn healthz_reports_version() {
        let app = app_over(Arc::new(MemoryObjectStore::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_exposition() {
        let app = app_over(Arc::new(MemoryObjectStore::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }

    #[tokio::test]
    async fn metrics_endpoint_absent_when_disabled() {
        let mut config = test_config();
        config.observability.metrics_enabled = false;
        let app = app_with_config(Arc::new(MemoryObjectStore::new()), config);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
