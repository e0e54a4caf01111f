use std::time::Duration;

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::config::StorageConfig;
use crate::core::error::StorageError;

use super::{GetObjectOutput, ObjectInfo, ObjectStore};

// ---------------------------------------------------------------------------
// S3ObjectStore
// ---------------------------------------------------------------------------

/// Production storage backend wrapping `aws-sdk-s3`.
///
/// Supports both AWS S3 and S3-compatible stores (MinIO, DigitalOcean Spaces,
/// etc.) via configurable endpoint and path-style addressing.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3ObjectStore from configuration.
    ///
    /// Credentials come from configuration only; `AppConfig::validate`
    /// guarantees they are present before this is reached.
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "coursecast-config",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.path_style);

        if !config.endpoint.is_empty() {
            s3_config_builder = s3_config_builder.endpoint_url(&config.endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    async fn list_course_prefixes(&self) -> Result<Vec<String>, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .delimiter("/")
            .send()
            .await
            .map_err(|e| StorageError::ListFailed {
                prefix: String::new(),
                reason: e.to_string(),
            })?;

        let prefixes = output
            .common_prefixes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.prefix)
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(prefixes)
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation_token {
                req = req.continuation_token(token);
            }

            let output = req.send().await.map_err(|e| StorageError::ListFailed {
                prefix: prefix.to_string(),
                reason: e.to_string(),
            })?;

            if let Some(contents) = output.contents {
                for obj in contents {
                    let key = obj.key.unwrap_or_default();
                    let size = obj.size.unwrap_or(0) as u64;
                    let last_modified = obj
                        .last_modified
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
                        .unwrap_or_else(Utc::now);

                    objects.push(ObjectInfo {
                        key,
                        size,
                        last_modified,
                    });
                }
            }

            if output.is_truncated.unwrap_or(false) {
                continuation_token = output.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn get_object(&self, path: &str) -> Result<GetObjectOutput, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|s| s.is_no_such_key()) == Some(true) {
                    StorageError::NotFound {
                        path: path.to_string(),
                    }
                } else {
                    StorageError::GetFailed {
                        path: path.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let content_type = output
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let body_bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::GetFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?
            .into_bytes();

        Ok(GetObjectOutput {
            body: Bytes::from(body_bytes),
            content_type,
        })
    }

    async fn sign_url(&self, path: &str, expiry_secs: u64) -> Result<String, StorageError> {
        let presigning =
            PresigningConfig::expires_in(Duration::from_secs(expiry_secs)).map_err(|e| {
                StorageError::SignFailed {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::SignFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        debug!(path, expiry_secs, "issued signed URL");
        Ok(request.uri().to_string())
    }
}
