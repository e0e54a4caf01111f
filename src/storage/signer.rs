use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::core::error::StorageError;
use crate::observability::metrics as obs;

use super::ObjectStore;

// ---------------------------------------------------------------------------
// Signed-URL issuer
// ---------------------------------------------------------------------------

/// Memoizing wrapper over the store's URL-signing primitive.
///
/// Entries are keyed by `(object key, expiry seconds)` and live for the
/// process lifetime — the cache does not track that an issued URL has since
/// expired, so callers must choose expiries generously relative to how long
/// a cached URL may be handed out.
pub struct UrlSigner<S> {
    store: Arc<S>,
    cache: Mutex<HashMap<(String, u64), String>>,
}

impl<S: ObjectStore> UrlSigner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Return a signed URL for `key`, reusing a previously issued one when
    /// the same `(key, expiry)` pair has been signed this process run.
    pub async fn sign(&self, key: &str, expiry_secs: u64) -> Result<String, StorageError> {
        let cache_key = (key.to_string(), expiry_secs);

        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(url) = cache.get(&cache_key) {
                trace!(key, expiry_secs, "signed URL cache hit");
                return Ok(url.clone());
            }
        }

        let url = self.store.sign_url(key, expiry_secs).await?;
        obs::inc_signed_urls_issued();

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(cache_key, url.clone());
        obs::set_url_cache_entries(cache.len() as f64);

        Ok(url)
    }

    /// Drop every cached URL.
    pub fn clear(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.clear();
        obs::set_url_cache_entries(0.0);
    }

    /// Number of cached URLs, reported by the health endpoint.
    pub fn entry_count(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
