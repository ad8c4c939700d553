// mandi/src/error.rs

//! Error taxonomy for the discovery and list-consistency core.
//!
//! Pure rule violations (`ComparisonFull`, `CategoryMismatch`) are ordinary values the
//! UI displays and lets expire. Record-store failures carry their `StoreError` source so
//! a caller can decide whether to retry. Nothing here is retried by the crate itself.

use crate::model::Category;
use thiserror::Error;

/// Failures reported by a `RecordStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Record store unavailable: {0}")]
  Unavailable(String),

  #[error("Record not found: {collection}/{id}")]
  NotFound { collection: String, id: String },

  #[error("Permission denied on '{collection}'")]
  PermissionDenied { collection: String },

  #[error("Record store call timed out after {millis}ms")]
  Timeout { millis: u128 },

  #[error("Record store backend error: {source}")]
  Backend {
    #[source]
    source: anyhow::Error,
  },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Wiring problems in a stage pipeline. These are programming errors surfaced at run time.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Stage not found: {stage}")]
  StageNotFound { stage: String },

  #[error("Handler missing for non-optional stage: {stage}")]
  HandlerMissing { stage: String },
}

/// Rejections from the comparison shortlist rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComparisonError {
  #[error("You can only compare up to {capacity} products at a time.")]
  Full { capacity: usize },

  #[error("Cannot compare {attempted} with {existing}. Please select products from the same category.")]
  CategoryMismatch { existing: Category, attempted: Category },
}

#[derive(Debug, Error)]
pub enum MandiError {
  #[error("Sign in required for {operation}")]
  NotAuthenticated { operation: &'static str },

  #[error("Not permitted: {operation}")]
  Forbidden { operation: &'static str },

  #[error("You can only compare up to {capacity} products at a time.")]
  ComparisonFull { capacity: usize },

  #[error("Cannot compare {attempted} with {existing}")]
  CategoryMismatch { existing: Category, attempted: Category },

  #[error("Product discovery unavailable: {source}")]
  DiscoveryUnavailable {
    #[source]
    source: StoreError,
  },

  #[error("Notification feed '{feed}' failed to attach: {source}")]
  SubscriptionFailed {
    feed: &'static str,
    #[source]
    source: StoreError,
  },

  #[error("Seller {seller_id} trust cascade incomplete: {updated} updated, {} failed", .failed.len())]
  CascadeIncomplete {
    seller_id: String,
    updated: usize,
    failed: Vec<String>,
  },

  #[error("{operation} incomplete, {} record(s) not written", .failed.len())]
  PartialWrite { operation: &'static str, failed: Vec<String> },

  #[error("Record store error during {operation}: {source}")]
  Store {
    operation: &'static str,
    #[source]
    source: StoreError,
  },

  #[error("Not found: {collection}/{id}")]
  NotFound { collection: String, id: String },

  #[error("Malformed record {collection}/{id}: {source}")]
  Decode {
    collection: String,
    id: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Image upload failed for '{file_name}': {source}")]
  Upload {
    file_name: String,
    #[source]
    source: anyhow::Error,
  },

  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Pipeline error: {source}")]
  Pipeline {
    #[from]
    source: PipelineError,
  },
}

impl MandiError {
  /// Wraps a store failure with the operation that issued it.
  pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> MandiError {
    move |source| match source {
      StoreError::NotFound { collection, id } => MandiError::NotFound { collection, id },
      source => MandiError::Store { operation, source },
    }
  }

  /// True for the transient, display-only comparison rejections.
  pub fn is_transient(&self) -> bool {
    matches!(self, MandiError::ComparisonFull { .. } | MandiError::CategoryMismatch { .. })
  }
}

impl From<ComparisonError> for MandiError {
  fn from(err: ComparisonError) -> Self {
    match err {
      ComparisonError::Full { capacity } => MandiError::ComparisonFull { capacity },
      ComparisonError::CategoryMismatch { existing, attempted } => {
        MandiError::CategoryMismatch { existing, attempted }
      }
    }
  }
}

// Backend adapters tend to surface `anyhow` errors; keep them opaque.
impl From<anyhow::Error> for StoreError {
  fn from(source: anyhow::Error) -> Self {
    StoreError::Backend { source }
  }
}

pub type Result<T, E = MandiError> = std::result::Result<T, E>;
