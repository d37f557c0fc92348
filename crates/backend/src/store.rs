//! Collaborator traits for the remote backend.
//!
//! The resolver and the admin console are written against these traits,
//! which keeps them independent of the HTTP transport and testable with
//! the in-memory backend.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::Error;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// Raw settings overrides as stored remotely.
///
/// Only overridden keys are expected; value types are not guaranteed.
pub type SparseRecord = BTreeMap<String, serde_json::Value>;

/// Key-addressed binary storage with public URL issuance.
pub trait ObjectStore: Send + Sync {
    /// Public URL for `path` in `bucket`, or `None` if no URL can be issued.
    ///
    /// A returned URL says nothing about whether the object exists.
    fn public_url<'a>(&'a self, bucket: &'a str, path: &'a str) -> StoreFuture<'a, Option<String>>;

    /// Checks that the object behind a public URL exists, without
    /// transferring its body.
    fn exists<'a>(&'a self, url: &'a str) -> StoreFuture<'a, bool>;

    /// Stores `data` under `path`. With `upsert` an existing object is replaced.
    fn upload<'a>(
        &'a self,
        bucket: &'a str,
        path: &'a str,
        data: Vec<u8>,
        content_type: &'a str,
        upsert: bool,
    ) -> StoreFuture<'a, ()>;

    /// Removes the objects under `paths`. Missing objects are not an error.
    fn remove<'a>(&'a self, bucket: &'a str, paths: &'a [String]) -> StoreFuture<'a, ()>;
}

/// Key-value table of settings overrides.
pub trait SettingsStore: Send + Sync {
    /// Fetches every stored override in one batch.
    fn get_all(&self) -> StoreFuture<'_, SparseRecord>;

    /// Inserts or replaces the override for `key`.
    fn upsert<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()>;

    /// Deletes the override for `key`, restoring its default.
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}
