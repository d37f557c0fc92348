//! In-process backend for offline previews and tests.
//!
//! Objects and settings live in memory. Faults can be injected to
//! exercise the fallback paths: a backend that is offline, slow, missing
//! its bucket or table, or whose existence probes fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::Error;
use crate::store::{ObjectStore, SettingsStore, SparseRecord, StoreFuture};

const URL_SCHEME: &str = "memory://";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<(String, String), StoredObject>,
    settings: SparseRecord,
    dropped_buckets: HashSet<String>,
    table_missing: bool,
    offline: bool,
    latency: Duration,
    failing_probes: HashSet<String>,
    probes: usize,
}

/// In-memory object store and settings table.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an object directly, bypassing fault injection.
    pub fn put_object(&self, bucket: &str, path: &str, data: impl Into<Vec<u8>>) {
        self.lock().objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                data: data.into(),
                content_type: "application/octet-stream".into(),
            },
        );
    }

    /// Returns a stored object's bytes.
    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.data.clone())
    }

    /// Returns a stored object's content type.
    pub fn content_type(&self, bucket: &str, path: &str) -> Option<String> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.content_type.clone())
    }

    /// Stores a raw settings value, which need not be a string.
    pub fn put_setting(&self, key: &str, value: impl Into<serde_json::Value>) {
        self.lock().settings.insert(key.to_string(), value.into());
    }

    /// Snapshot of the stored settings overrides.
    pub fn settings(&self) -> SparseRecord {
        self.lock().settings.clone()
    }

    /// Makes every operation fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Delays every operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Makes every operation on `bucket` fail with "bucket not found".
    pub fn drop_bucket(&self, bucket: &str) {
        self.lock().dropped_buckets.insert(bucket.to_string());
    }

    /// Makes every settings operation fail with "relation does not exist".
    pub fn drop_table(&self) {
        self.lock().table_missing = true;
    }

    /// Makes the existence probe for `url` fail with a server error.
    pub fn fail_probe_for(&self, url: &str) {
        self.lock().failing_probes.insert(url.to_string());
    }

    /// Number of existence probes served so far.
    pub fn probe_count(&self) -> usize {
        self.lock().probes
    }

    /// Waits out the configured latency, then checks connectivity.
    async fn enter(&self) -> Result<(), Error> {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.lock().offline {
            return Err(Error::Offline);
        }
        Ok(())
    }

    fn check_bucket(inner: &Inner, bucket: &str) -> Result<(), Error> {
        if inner.dropped_buckets.contains(bucket) {
            return Err(Error::Api {
                status: 404,
                body: r#"{"statusCode":"404","error":"Bucket not found","message":"Bucket not found"}"#
                    .into(),
            });
        }
        Ok(())
    }

    fn check_table(inner: &Inner) -> Result<(), Error> {
        if inner.table_missing {
            return Err(Error::Api {
                status: 404,
                body: r#"{"code":"42P01","message":"relation \"public.site_settings\" does not exist"}"#
                    .into(),
            });
        }
        Ok(())
    }
}

/// Splits `memory://bucket/path` into its parts.
fn parse_url(url: &str) -> Option<(&str, &str)> {
    url.strip_prefix(URL_SCHEME)?.split_once('/')
}

impl ObjectStore for MemoryBackend {
    fn public_url<'a>(&'a self, bucket: &'a str, path: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            self.enter().await?;
            if bucket.is_empty() || path.is_empty() {
                return Ok(None);
            }
            Ok(Some(format!("{URL_SCHEME}{bucket}/{path}")))
        })
    }

    fn exists<'a>(&'a self, url: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.enter().await?;
            let mut inner = self.lock();
            inner.probes += 1;
            if inner.failing_probes.contains(url) {
                return Err(Error::Api {
                    status: 500,
                    body: "probe failed".into(),
                });
            }
            let Some((bucket, path)) = parse_url(url) else {
                return Ok(false);
            };
            Ok(inner
                .objects
                .contains_key(&(bucket.to_string(), path.to_string())))
        })
    }

    fn upload<'a>(
        &'a self,
        bucket: &'a str,
        path: &'a str,
        data: Vec<u8>,
        content_type: &'a str,
        upsert: bool,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.enter().await?;
            let mut inner = self.lock();
            Self::check_bucket(&inner, bucket)?;
            let key = (bucket.to_string(), path.to_string());
            if !upsert && inner.objects.contains_key(&key) {
                return Err(Error::Api {
                    status: 409,
                    body: "The resource already exists".into(),
                });
            }
            inner.objects.insert(
                key,
                StoredObject {
                    data,
                    content_type: content_type.to_string(),
                },
            );
            Ok(())
        })
    }

    fn remove<'a>(&'a self, bucket: &'a str, paths: &'a [String]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.enter().await?;
            let mut inner = self.lock();
            Self::check_bucket(&inner, bucket)?;
            for path in paths {
                inner.objects.remove(&(bucket.to_string(), path.clone()));
            }
            Ok(())
        })
    }
}

impl SettingsStore for MemoryBackend {
    fn get_all(&self) -> StoreFuture<'_, SparseRecord> {
        Box::pin(async move {
            self.enter().await?;
            let inner = self.lock();
            Self::check_table(&inner)?;
            Ok(inner.settings.clone())
        })
    }

    fn upsert<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.enter().await?;
            let mut inner = self.lock();
            Self::check_table(&inner)?;
            inner
                .settings
                .insert(key.to_string(), serde_json::Value::String(value.to_string()));
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.enter().await?;
            let mut inner = self.lock();
            Self::check_table(&inner)?;
            inner.settings.remove(key);
            Ok(())
        })
    }
}

impl From<BTreeMap<String, serde_json::Value>> for MemoryBackend {
    fn from(settings: BTreeMap<String, serde_json::Value>) -> Self {
        let backend = Self::new();
        backend.lock().settings = settings;
        backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn public_url_then_probe() {
        let backend = MemoryBackend::new();
        backend.put_object("site-images", "hero.jpg", b"img".to_vec());

        let url = backend
            .public_url("site-images", "hero.jpg")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(url, "memory://site-images/hero.jpg");
        assert!(backend.exists(&url).await.unwrap());

        let missing = backend
            .public_url("site-images", "about.jpg")
            .await
            .unwrap()
            .unwrap();
        assert!(!backend.exists(&missing).await.unwrap());
        assert_eq!(backend.probe_count(), 2);
    }

    #[tokio::test]
    async fn offline_fails_everything() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(matches!(
            backend.public_url("b", "p").await,
            Err(Error::Offline)
        ));
        assert!(matches!(backend.get_all().await, Err(Error::Offline)));
    }

    #[tokio::test]
    async fn upload_without_upsert_conflicts() {
        let backend = MemoryBackend::new();
        backend
            .upload("b", "p", vec![1], "image/png", false)
            .await
            .unwrap();
        let err = backend
            .upload("b", "p", vec![2], "image/png", false)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));

        backend
            .upload("b", "p", vec![3], "image/webp", true)
            .await
            .unwrap();
        assert_eq!(backend.object("b", "p"), Some(vec![3]));
        assert_eq!(backend.content_type("b", "p").as_deref(), Some("image/webp"));
    }

    #[tokio::test]
    async fn dropped_bucket_is_missing_container() {
        let backend = MemoryBackend::new();
        backend.drop_bucket("site-images");
        let err = backend
            .upload("site-images", "hero.jpg", vec![1], "image/jpeg", true)
            .await
            .unwrap_err();
        assert!(err.is_missing_container());
    }

    #[tokio::test]
    async fn dropped_table_is_missing_container() {
        let backend = MemoryBackend::new();
        backend.drop_table();
        let err = backend.get_all().await.unwrap_err();
        assert!(err.is_missing_container());
    }

    #[tokio::test]
    async fn settings_upsert_and_delete() {
        let backend = MemoryBackend::new();
        backend.upsert("phone", "Z").await.unwrap();
        assert_eq!(backend.get_all().await.unwrap()["phone"], "Z");

        backend.delete("phone").await.unwrap();
        assert!(backend.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_ignores_missing_objects() {
        let backend = MemoryBackend::new();
        backend.put_object("b", "a.jpg", vec![1]);
        let paths = vec!["a.jpg".to_string(), "nope.jpg".to_string()];
        backend.remove("b", &paths).await.unwrap();
        assert!(backend.object("b", "a.jpg").is_none());
    }

    #[tokio::test]
    async fn failing_probe_errors() {
        let backend = MemoryBackend::new();
        backend.put_object("b", "a.jpg", vec![1]);
        backend.fail_probe_for("memory://b/a.jpg");
        assert!(backend.exists("memory://b/a.jpg").await.is_err());
    }

    #[tokio::test]
    async fn latency_delays_operations() {
        tokio::time::pause();
        let backend = MemoryBackend::new();
        backend.set_latency(Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        backend.get_all().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
