//! Image slot resolution.
//!
//! For every slot the resolver asks the object store for the public URL of
//! the slot's override, probes that the object exists, and returns the URL
//! with a cache-busting stamp. Anything else (no URL, missing object,
//! failed probe, timeout, deadline, panic) yields the slot's default path.
//! Slots resolve concurrently and independently.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use clinicsite_backend::ObjectStore;
use clinicsite_registry::{ImageRecord, Registry};
use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, warn};

use crate::clock::{CacheBuster, Clock};
use crate::config::ResolverConfig;
use crate::error::ResolutionError;
use crate::map::ImageMap;

/// Resolves image slots against an object store.
pub struct AssetResolver {
    store: Arc<dyn ObjectStore>,
    config: ResolverConfig,
    buster: CacheBuster,
}

impl AssetResolver {
    /// Creates a resolver stamping URLs with the system clock.
    pub fn new(store: Arc<dyn ObjectStore>, config: ResolverConfig) -> Self {
        Self {
            store,
            config,
            buster: CacheBuster::default(),
        }
    }

    /// Replaces the clock used for cache-busting stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.buster = CacheBuster::new(clock);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves every registered slot.
    ///
    /// The returned map always holds every registry id. All slots share
    /// one cache-busting stamp and one deadline; a slot still pending at
    /// the deadline gets its default while settled slots keep their result.
    pub async fn resolve_all(&self, registry: &Registry) -> ImageMap {
        let started = Instant::now();
        let deadline = started + self.config.deadline;
        let stamp = self.buster.stamp();

        let resolved = join_all(
            registry
                .iter()
                .map(|record| self.resolve_until(record, stamp, deadline)),
        )
        .await;

        let overrides = resolved.iter().filter(|(_, is_remote)| *is_remote).count();
        debug!(
            slots = resolved.len(),
            overrides,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "image resolution pass complete"
        );

        resolved
            .into_iter()
            .map(|((id, url), _)| (id, url))
            .collect()
    }

    /// Resolves a single slot with a fresh stamp and deadline.
    pub async fn resolve(&self, record: &ImageRecord) -> String {
        let deadline = Instant::now() + self.config.deadline;
        let ((_, url), _) = self
            .resolve_until(record, self.buster.stamp(), deadline)
            .await;
        url
    }

    /// Runs one slot to completion, collapsing every failure to the default.
    ///
    /// Returns `((id, url), is_remote)`.
    async fn resolve_until(
        &self,
        record: &ImageRecord,
        stamp: i64,
        deadline: Instant,
    ) -> ((String, String), bool) {
        let attempt = AssertUnwindSafe(self.try_resolve(record, stamp)).catch_unwind();
        let outcome = match timeout_at(deadline, attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ResolutionError::Panicked),
            Err(_) => Err(ResolutionError::DeadlineExceeded),
        };

        match outcome {
            Ok(url) => ((record.id.clone(), url), true),
            Err(e) => {
                if e.is_expected() {
                    debug!(image = %record.id, reason = %e, "using default image");
                } else {
                    warn!(image = %record.id, error = %e, "image resolution failed, using default");
                }
                ((record.id.clone(), record.default_path.clone()), false)
            }
        }
    }

    async fn try_resolve(&self, record: &ImageRecord, stamp: i64) -> Result<String, ResolutionError> {
        let per_call = self.config.per_call_timeout;

        let url = timeout(
            per_call,
            self.store.public_url(&self.config.bucket, &record.storage_path),
        )
        .await
        .map_err(|_| ResolutionError::Timeout)?
        .map_err(ResolutionError::Lookup)?
        .filter(|u| !u.is_empty())
        .ok_or(ResolutionError::NoDescriptor)?;

        let exists = timeout(per_call, self.store.exists(&url))
            .await
            .map_err(|_| ResolutionError::Timeout)?
            .map_err(ResolutionError::Probe)?;
        if !exists {
            return Err(ResolutionError::NotFound);
        }

        Ok(CacheBuster::bust(&url, stamp))
    }
}
