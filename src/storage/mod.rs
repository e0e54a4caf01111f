pub mod memory;
pub mod s3;
pub mod signer;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::StorageError;

// ---------------------------------------------------------------------------
// ObjectStore trait
// ---------------------------------------------------------------------------

/// Trait-based abstraction over the object store.
///
/// The production implementation (`S3ObjectStore`) wraps `aws-sdk-s3`.
/// Tests and local development use `MemoryObjectStore` without external deps.
pub trait ObjectStore: Send + Sync {
    /// List the top-level course prefixes in the bucket.
    fn list_course_prefixes(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// List objects under a prefix.
    fn list_objects(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ObjectInfo>, StorageError>> + Send;

    /// Read an object from storage.
    fn get_object(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<GetObjectOutput, StorageError>> + Send;

    /// Issue a time-limited signed URL granting read access to an object.
    fn sign_url(
        &self,
        path: &str,
        expiry_secs: u64,
    ) -> impl std::future::Future<Output = Result<String, StorageError>> + Send;
}

// ---------------------------------------------------------------------------
// Storage types
// ---------------------------------------------------------------------------

/// Output from a GET object operation.
#[derive(Debug, Clone)]
pub struct GetObjectOutput {
    pub body: Bytes,
    pub content_type: String,
}

/// Information about an object from a LIST operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}
