use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{error, info};

use crate::core::error::CatalogError;
use crate::observability::metrics as obs;
use crate::storage::signer::UrlSigner;
use crate::storage::ObjectStore;

use super::builder::CatalogBuilder;
use super::model::Course;

// ---------------------------------------------------------------------------
// Catalog cache
// ---------------------------------------------------------------------------

/// Observable cache lifecycle, reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Building,
    Valid,
    Stale,
}

impl CacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::Empty => "empty",
            CacheState::Building => "building",
            CacheState::Valid => "valid",
            CacheState::Stale => "stale",
        }
    }
}

/// Shared result of one rebuild. `Arc` on both sides so every waiter on the
/// in-flight build receives the same data.
type BuildOutcome = Result<Arc<Vec<Course>>, Arc<CatalogError>>;
type SharedBuild = Shared<BoxFuture<'static, BuildOutcome>>;

struct CacheEntry {
    courses: Arc<Vec<Course>>,
    generated_at: Instant,
}

#[derive(Default)]
struct Inner {
    entry: Option<CacheEntry>,
    /// Single-flight guard: concurrent callers attach to this future
    /// instead of starting parallel rebuilds.
    inflight: Option<SharedBuild>,
}

/// Process-wide, time-boxed cache of the full multi-course catalog.
///
/// Rebuilds replace the entry atomically; a rebuild, once started, runs to
/// completion or failure. Never holds the lock across an await.
pub struct CatalogCache<S> {
    builder: CatalogBuilder<S>,
    signer: Arc<UrlSigner<S>>,
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl<S: ObjectStore + 'static> CatalogCache<S> {
    pub fn new(builder: CatalogBuilder<S>, signer: Arc<UrlSigner<S>>, ttl: Duration) -> Self {
        Self {
            builder,
            signer,
            ttl,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Return the cached catalog, rebuilding when empty or stale. Concurrent
    /// callers during a rebuild all receive the result of that one rebuild.
    pub async fn get_courses(self: &Arc<Self>) -> Result<Arc<Vec<Course>>, Arc<CatalogError>> {
        let build = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

            if let Some(entry) = &inner.entry {
                if entry.generated_at.elapsed() < self.ttl {
                    obs::inc_catalog_cache_hit();
                    return Ok(entry.courses.clone());
                }
            }

            obs::inc_catalog_cache_miss();
            match &inner.inflight {
                Some(build) => build.clone(),
                None => {
                    let build = self.begin_rebuild();
                    inner.inflight = Some(build.clone());
                    build
                }
            }
        };

        build.await
    }

    /// Force the cache EMPTY and drop every issued-URL cache entry. An
    /// in-flight rebuild is not aborted; it will repopulate on completion.
    pub fn clear(&self) {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.entry = None;
        }
        self.signer.clear();
        info!("catalog cache cleared");
    }

    /// Seed the cache from a pre-generated snapshot, making it immediately
    /// VALID without paying the listing cost.
    pub fn seed(&self, courses: Vec<Course>) {
        let courses = Arc::new(courses);
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entry = Some(CacheEntry {
            courses,
            generated_at: Instant::now(),
        });
    }

    /// Current lifecycle state. BUILDING takes precedence: it is the state
    /// callers observe while a rebuild is in flight, whatever entry remains.
    pub fn state(&self) -> CacheState {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.inflight.is_some() {
            return CacheState::Building;
        }
        match &inner.entry {
            None => CacheState::Empty,
            Some(entry) if entry.generated_at.elapsed() < self.ttl => CacheState::Valid,
            Some(_) => CacheState::Stale,
        }
    }

    pub fn is_building(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .inflight
            .is_some()
    }

    /// Spawn the rebuild task and return the shareable handle waiters attach
    /// to. The task itself installs the new entry and clears the in-flight
    /// slot, so completion is recorded even with no remaining waiters.
    fn begin_rebuild(self: &Arc<Self>) -> SharedBuild {
        let (tx, rx) = oneshot::channel::<BuildOutcome>();
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let start = std::time::Instant::now();
            let outcome: BuildOutcome = match cache.builder.build_all().await {
                Ok(courses) => Ok(Arc::new(courses)),
                Err(e) => Err(Arc::new(e)),
            };

            {
                let mut inner = cache.inner.lock().unwrap_or_else(|e| e.into_inner());
                inner.inflight = None;
                if let Ok(courses) = &outcome {
                    inner.entry = Some(CacheEntry {
                        courses: courses.clone(),
                        generated_at: Instant::now(),
                    });
                }
            }

            match &outcome {
                Ok(courses) => {
                    obs::record_catalog_rebuild("success", start.elapsed().as_secs_f64());
                    obs::set_catalog_sizes(
                        courses.len() as f64,
                        courses.iter().map(|c| c.videos.len()).sum::<usize>() as f64,
                    );
                    info!(
                        courses = courses.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "catalog rebuild complete"
                    );
                }
                Err(e) => {
                    obs::record_catalog_rebuild("failure", start.elapsed().as_secs_f64());
                    error!(error = %e, "catalog rebuild failed");
                }
            }

            let _ = tx.send(outcome);
        });

        async move {
            match rx.await {
                Ok(outcome) => outcome,
                // Rebuild task dropped without reporting (runtime shutdown).
                Err(_) => Err(Arc::new(CatalogError::RebuildAborted)),
            }
        }
        .boxed()
        .shared()
    }
}
