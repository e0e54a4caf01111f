use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coursecast::catalog::builder::CatalogBuilder;
use coursecast::catalog::cache::CatalogCache;
use coursecast::catalog::snapshot::CatalogSnapshot;
use coursecast::core::config::{AppConfig, ObservabilityConfig};
use coursecast::delivery::router::{build_router, AppState};
use coursecast::observability::metrics as obs;
use coursecast::storage::memory::MemoryObjectStore;
use coursecast::storage::s3::S3ObjectStore;
use coursecast::storage::signer::UrlSigner;
use coursecast::storage::ObjectStore;

fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    let metrics_handle = obs::install_prometheus_recorder();
    obs::describe_all_metrics();

    info!(
        backend = %config.storage.backend,
        bucket = %config.storage.bucket,
        "starting coursecast"
    );

    match config.storage.backend.as_str() {
        "memory" => {
            let store = Arc::new(MemoryObjectStore::new());
            serve(store, config, metrics_handle).await
        }
        // validate() already rejected anything that is not "s3" or "memory".
        _ => {
            let store = Arc::new(S3ObjectStore::new(&config.storage));
            serve(store, config, metrics_handle).await
        }
    }
}

async fn serve<S: ObjectStore + 'static>(
    store: Arc<S>,
    config: AppConfig,
    metrics_handle: PrometheusHandle,
) -> anyhow::Result<()> {
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

    // Seed from the pre-generated snapshot when one is on disk; its URLs
    // carry the long pre-generation expiry, so they outlive the catalog TTL.
    match CatalogSnapshot::load(&config.catalog.snapshot_path).await {
        Ok(snapshot) => {
            info!(
                courses = snapshot.courses.len(),
                videos = snapshot.video_count(),
                generated_at = %snapshot.generated_at,
                "seeding catalog cache from snapshot"
            );
            cache.seed(snapshot.courses);
        }
        Err(e) => {
            info!(error = %e, "no usable snapshot, catalog will build live");
            // Warm the cache in the background so the first request does not
            // pay the full listing cost.
            let warm_cache = cache.clone();
            tokio::spawn(async move {
                if let Err(e) = warm_cache.get_courses().await {
                    warn!(error = %e, "initial catalog build failed");
                }
            });
        }
    }

    let state = AppState {
        store,
        signer,
        cache,
        builder,
        config: config.clone(),
        start_time: std::time::Instant::now(),
        metrics_handle,
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
