//! Offline pre-generation pass.
//!
//! Builds the full catalog with long-lived signed URLs and writes it to the
//! snapshot file the server seeds its cache from at startup. Run it from the
//! same config directory as the server:
//!
//! ```text
//! COURSECAST_STORAGE_ACCESS_KEY_ID=... \
//! COURSECAST_STORAGE_SECRET_ACCESS_KEY=... cargo run --bin pregenerate
//! ```

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use coursecast::catalog::builder::CatalogBuilder;
use coursecast::catalog::snapshot::CatalogSnapshot;
use coursecast::core::config::AppConfig;
use coursecast::storage::s3::S3ObjectStore;
use coursecast::storage::signer::UrlSigner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if config.storage.backend != "s3" {
        anyhow::bail!("pre-generation only makes sense against the s3 backend");
    }

    let store = Arc::new(S3ObjectStore::new(&config.storage));
    let signer = Arc::new(UrlSigner::new(store.clone()));
    let builder = CatalogBuilder::new(
        store,
        signer,
        config.server.public_base_url.clone(),
        config.catalog.pregen_sign_expiry_secs,
    );

    info!(
        bucket = %config.storage.bucket,
        expiry_secs = config.catalog.pregen_sign_expiry_secs,
        "pre-generating catalog snapshot"
    );

    let courses = builder.build_all().await?;
    let snapshot = CatalogSnapshot::new(config.storage.bucket.clone(), courses);

    info!(
        courses = snapshot.courses.len(),
        videos = snapshot.video_count(),
        "catalog built"
    );

    snapshot.write(&config.catalog.snapshot_path).await?;
    info!(path = %config.catalog.snapshot_path, "snapshot written");

    Ok(())
}
