use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::core::error::StorageError;

use super::{GetObjectOutput, ObjectInfo, ObjectStore};

// ---------------------------------------------------------------------------
// MemoryObjectStore — for tests and local development
// ---------------------------------------------------------------------------

/// In-memory storage backend.
///
/// Stores all objects in a `HashMap<String, StoredObject>` behind a `RwLock`.
/// Signed URLs are synthetic but stable per call, and the store counts
/// listing and signing calls so tests can assert on cache behavior.
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    list_calls: AtomicUsize,
    sign_calls: AtomicUsize,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    created_at: chrono::DateTime<Utc>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            list_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    /// Insert an object directly, bypassing any API surface.
    pub async fn put_object(&self, path: &str, data: Bytes, content_type: &str) {
        let mut objects = self.objects.write().await;
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                created_at: Utc::now(),
            },
        );
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn sign_call_count(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn list_course_prefixes(&self) -> Result<Vec<String>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.read().await;
        let mut prefixes: Vec<String> = objects
            .keys()
            .filter_map(|k| k.split_once('/').map(|(course, _)| course.to_string()))
            .collect();
        prefixes.sort();
        prefixes.dedup();
        Ok(prefixes)
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.read().await;
        let mut result: Vec<ObjectInfo> = objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| ObjectInfo {
                key: k.clone(),
                size: v.data.len() as u64,
                last_modified: v.created_at,
            })
            .collect();
        result.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(result)
    }

    async fn get_object(&self, path: &str) -> Result<GetObjectOutput, StorageError> {
        let objects = self.objects.read().await;
        let obj = objects.get(path).ok_or_else(|| StorageError::NotFound {
            path: path.to_string(),
        })?;

        Ok(GetObjectOutput {
            body: obj.data.clone(),
            content_type: obj.content_type.clone(),
        })
    }

    async fn sign_url(&self, path: &str, expiry_secs: u64) -> Result<String, StorageError> {
        let objects = self.objects.read().await;
        if !objects.contains_key(path) {
            return Err(StorageError::SignFailed {
                path: path.to_string(),
                reason: "no such object".to_string(),
            });
        }
        let n = self.sign_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "memory://bucket/{}?X-Expires={}&sig={}",
            path, expiry_secs, n
        ))
    }
}
