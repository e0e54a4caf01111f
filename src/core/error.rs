use thiserror::Error;

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors originating from the object store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("listing failed for prefix {prefix}: {reason}")]
    ListFailed { prefix: String, reason: String },

    #[error("GET failed for {path}: {reason}")]
    GetFailed { path: String, reason: String },

    #[error("object not found: {path}")]
    NotFound { path: String },

    #[error("signing failed for {path}: {reason}")]
    SignFailed { path: String, reason: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

/// Errors from assembling the course catalog.
///
/// A failure building one course is logged and the course is excluded;
/// only failures that make the whole catalog unbuildable (the top-level
/// listing) surface through this type.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("course listing failed: {0}")]
    Listing(#[source] StorageError),

    #[error("URL signing failed: {0}")]
    Signing(#[source] StorageError),

    #[error("catalog rebuild aborted before completion")]
    RebuildAborted,
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// HTTP-facing errors produced by the delivery handlers.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("subtitle not found: {course}/{file}")]
    SubtitleNotFound { course: String, file: String },

    #[error("object key is required")]
    MissingObjectKey,

    #[error("catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    #[error("signing failed: {reason}")]
    SigningFailed { reason: String },
}

impl DeliveryError {
    /// Map a DeliveryError to its HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            DeliveryError::SubtitleNotFound { .. } => 404,
            DeliveryError::MissingObjectKey => 400,
            DeliveryError::CatalogUnavailable { .. } => 502,
            DeliveryError::SigningFailed { .. } => 502,
        }
    }

    /// Return the error code string for JSON responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            DeliveryError::SubtitleNotFound { .. } => "subtitle_not_found",
            DeliveryError::MissingObjectKey => "missing_object_key",
            DeliveryError::CatalogUnavailable { .. } => "catalog_unavailable",
            DeliveryError::SigningFailed { .. } => "signing_failed",
        }
    }
}
