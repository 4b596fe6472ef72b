//! # contract: universal interface for the object store backing the pipeline
//!
//! This module defines a single trait ([`ObjectStore`]) and concrete
//! supporting types for listing, reading and writing the durable objects the
//! pipeline works with: raw review files, the processed dataset, the
//! ingestion checkpoint and the published model artifacts.
//!
//! ## Interface & Extensibility
//! - Implement the [`ObjectStore`] trait to plug in new backends (local
//!   filesystem, cloud object storage, a test fake).
//! - All methods are async and return [`StoreError`] on failure.
//! - Absence of an object is a value ([`GetResult::Missing`]), never an
//!   error: callers that need to distinguish "not there" from "could not
//!   read" get both signals explicitly.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests.
//!
//! ## Requirements on implementors
//! - `list` must return a complete snapshot of the keys under the prefix at
//!   call time. An eventually-consistent backend only delays pickup of new
//!   objects to the next pipeline run.
//! - `put` must be an atomic full-object overwrite: readers never observe a
//!   partially written object.

use async_trait::async_trait;
use std::time::SystemTime;
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// One object returned by a listing: its key and when it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    /// Key uniquely naming the object inside the bucket, e.g.
    /// `raw_reviews/2024-03.csv`.
    pub key: String,
    /// Last-modified timestamp as reported by the backend.
    pub last_modified: SystemTime,
}

/// Result of a point read: the object's bytes, or an explicit absence marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetResult {
    Found(Vec<u8>),
    Missing,
}

/// Failure of the object store itself. Absence of an object is not a
/// `StoreError`; see [`GetResult::Missing`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store I/O failure at {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("object store backend failure: {0}")]
    Backend(String),
}

/// Trait for the durable object store all pipeline stages read and write.
///
/// The trait is `Send + Sync` and intended for async/await usage. It is
/// implemented by [`crate::store::FsStore`] for local directory buckets and
/// by `MockObjectStore` in tests.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object whose key starts with `prefix`, as a complete
    /// snapshot at call time.
    async fn list(&self, prefix: &str) -> Result<Vec<ListedObject>, StoreError>;

    /// Read one object in full, or report that it does not exist.
    async fn get(&self, key: &str) -> Result<GetResult, StoreError>;

    /// Write one object in full, atomically replacing any previous content.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}
