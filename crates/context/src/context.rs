//! Site context service object.
//!
//! Owns the image and settings read models and the resolvers that feed
//! them. Consumers read through [`SiteContext::image`] and
//! [`SiteContext::setting`], which fall back to the registry defaults
//! until the first pass completes, so no consumer needs defaults of its own.

use std::sync::Arc;

use clinicsite_backend::{ObjectStore, SettingsStore};
use clinicsite_registry::{Registry, SettingsRecord, default_settings};
use clinicsite_resolver::{AssetResolver, ImageMap, ResolverConfig, SettingsResolver};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::model::{Phase, ReadModel, Snapshot};

/// Resolved images and settings shared by every consumer of the site.
pub struct SiteContext {
    registry: Arc<Registry>,
    defaults: Arc<SettingsRecord>,
    assets: AssetResolver,
    settings_resolver: SettingsResolver,
    images: ReadModel<ImageMap>,
    settings: ReadModel<SettingsRecord>,
    cancel: CancellationToken,
}

impl SiteContext {
    /// Creates a context. Images start empty, settings start as `defaults`.
    pub fn new(
        registry: Registry,
        defaults: SettingsRecord,
        assets: AssetResolver,
        settings_resolver: SettingsResolver,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            settings: ReadModel::new(defaults.clone()),
            defaults: Arc::new(defaults),
            assets,
            settings_resolver,
            images: ReadModel::new(ImageMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a context over the builtin registry and defaults, with one
    /// backend serving both images and settings.
    pub fn from_backend<B>(backend: Arc<B>, config: ResolverConfig) -> Self
    where
        B: ObjectStore + SettingsStore + 'static,
    {
        let settings_resolver = SettingsResolver::new(backend.clone(), config.per_call_timeout);
        let assets = AssetResolver::new(backend, config);
        Self::new(
            Registry::builtin(),
            default_settings(),
            assets,
            settings_resolver,
        )
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn defaults(&self) -> &SettingsRecord {
        &self.defaults
    }

    /// Runs the first resolution pass. Does nothing if a pass has already
    /// been started or the context is disposed.
    pub async fn init(&self) {
        if self.images.phase() != Phase::Uninitialized
            || self.settings.phase() != Phase::Uninitialized
        {
            debug!("site context already initialized");
            return;
        }
        info!(slots = self.registry.len(), "initializing site context");
        self.refresh().await;
    }

    /// Spawns [`init`](Self::init) on the runtime.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let ctx = Arc::clone(self);
        tokio::spawn(async move { ctx.init().await })
    }

    /// Re-resolves images and settings concurrently.
    pub async fn refresh(&self) {
        tokio::join!(self.refresh_images(), self.refresh_settings());
    }

    /// Re-resolves every image slot and replaces the image map.
    pub async fn refresh_images(&self) {
        let Some(pass) = self.images.begin() else {
            return;
        };
        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("site context disposed, discarding image pass");
            }
            map = self.assets.resolve_all(&self.registry) => {
                pass.publish(map);
            }
        }
    }

    /// Re-fetches settings overrides and replaces the settings record.
    pub async fn refresh_settings(&self) {
        let Some(pass) = self.settings.begin() else {
            return;
        };
        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("site context disposed, discarding settings pass");
            }
            record = self.settings_resolver.resolve_settings(&self.defaults) => {
                pass.publish(record);
            }
        }
    }

    /// Stops the context. In-flight passes are abandoned and their results
    /// discarded; the last published values stay readable.
    pub fn dispose(&self) {
        self.cancel.cancel();
        self.images.dispose();
        self.settings.dispose();
        debug!("site context disposed");
    }

    /// URL for an image slot: the resolved URL, or the slot's default while
    /// unresolved. `None` only for ids outside the registry.
    pub fn image(&self, id: &str) -> Option<String> {
        self.images
            .read(|map| map.get(id).map(str::to_owned))
            .or_else(|| self.registry.default_path(id).map(str::to_owned))
    }

    /// Effective value of a setting.
    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings.read(|record| record.get(key).map(str::to_owned))
    }

    pub fn images(&self) -> Snapshot<ImageMap> {
        self.images.snapshot()
    }

    pub fn settings(&self) -> Snapshot<SettingsRecord> {
        self.settings.snapshot()
    }

    pub fn subscribe_images(&self) -> watch::Receiver<Snapshot<ImageMap>> {
        self.images.subscribe()
    }

    pub fn subscribe_settings(&self) -> watch::Receiver<Snapshot<SettingsRecord>> {
        self.settings.subscribe()
    }

    /// Whether any pass is in flight.
    pub fn is_loading(&self) -> bool {
        self.images.is_loading() || self.settings.is_loading()
    }

    /// Combined phase of both read models.
    pub fn phase(&self) -> Phase {
        let phases = [self.images.phase(), self.settings.phase()];
        if phases.contains(&Phase::Disposed) {
            Phase::Disposed
        } else if phases.contains(&Phase::Loading) {
            Phase::Loading
        } else if phases.iter().all(|p| *p == Phase::Ready) {
            Phase::Ready
        } else {
            Phase::Uninitialized
        }
    }
}

impl Drop for SiteContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
