//! Image slot administration.

use std::path::Path;
use std::sync::Arc;

use clinicsite_backend::ObjectStore;
use clinicsite_context::SiteContext;
use clinicsite_registry::{ImageRecord, Section};
use clinicsite_resolver::ImageMap;
use serde::Serialize;
use tracing::info;

use crate::error::AdminError;
use crate::media;

/// One row of the admin image listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSlot {
    pub id: String,
    pub label: String,
    pub section: Section,
    /// URL currently rendered for the slot.
    pub url: String,
    /// Whether a custom override is being served instead of the default.
    pub customized: bool,
}

/// Uploads and removes image overrides.
pub struct ImageAdmin {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    context: Arc<SiteContext>,
}

impl ImageAdmin {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, context: Arc<SiteContext>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            context,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Listing of every registered slot, in registration order.
    pub fn slots(&self, images: &ImageMap) -> Vec<ImageSlot> {
        let registry = self.context.registry();
        registry
            .iter()
            .map(|record| ImageSlot {
                id: record.id.clone(),
                label: record.label.clone(),
                section: record.section,
                url: images
                    .get(&record.id)
                    .unwrap_or(record.default_path.as_str())
                    .to_string(),
                customized: images.is_override(&record.id, registry),
            })
            .collect()
    }

    /// Listing built from the context's current image map.
    pub fn current_slots(&self) -> Vec<ImageSlot> {
        self.slots(&self.context.images().value)
    }

    fn record(&self, id: &str) -> Result<&ImageRecord, AdminError> {
        self.context
            .registry()
            .get(id)
            .ok_or_else(|| AdminError::UnknownImage(id.to_string()))
    }

    /// Stores `data` as the override for slot `id`, replacing any previous
    /// override, then refreshes the site images.
    pub async fn upload(&self, id: &str, data: Vec<u8>, content_type: &str) -> Result<(), AdminError> {
        let record = self.record(id)?;
        media::validate_upload(&data, content_type)?;

        let size = data.len();
        self.store
            .upload(&self.bucket, &record.storage_path, data, content_type, true)
            .await
            .map_err(|e| AdminError::from_storage(e, &self.bucket))?;
        info!(image = %id, path = %record.storage_path, size, "uploaded image override");

        self.context.refresh_images().await;
        Ok(())
    }

    /// Reads `path` from disk and uploads it as the override for `id`.
    ///
    /// Oversized files are rejected from their metadata, before any bytes
    /// are read.
    pub async fn upload_file(&self, id: &str, path: &Path) -> Result<(), AdminError> {
        self.record(id)?;
        let content_type = media::content_type_for_path(path).ok_or_else(|| {
            AdminError::InvalidUpload(format!("{} is not a supported image file", path.display()))
        })?;
        media::check_size(tokio::fs::metadata(path).await?.len())?;
        let data = tokio::fs::read(path).await?;
        self.upload(id, data, content_type).await
    }

    /// Removes the override for `id` so the default is served again.
    pub async fn reset(&self, id: &str) -> Result<(), AdminError> {
        let record = self.record(id)?;
        let paths = [record.storage_path.clone()];
        self.store
            .remove(&self.bucket, &paths)
            .await
            .map_err(|e| AdminError::from_storage(e, &self.bucket))?;
        info!(image = %id, "reset image to default");

        self.context.refresh_images().await;
        Ok(())
    }
}
