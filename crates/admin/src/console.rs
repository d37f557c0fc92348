//! Operator-facing admin console.
//!
//! [`AdminConsole`] runs admin mutations and records every outcome on its
//! [`StatusBoard`]. Failures are never returned to the caller.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clinicsite_backend::{ObjectStore, SettingsStore};
use clinicsite_context::SiteContext;
use tracing::warn;

use crate::error::AdminError;
use crate::images::{ImageAdmin, ImageSlot};
use crate::settings::{SettingView, SettingsAdmin};
use crate::status::{StatusBoard, StatusMessage};

pub struct AdminConsole {
    images: ImageAdmin,
    settings: SettingsAdmin,
    board: Mutex<StatusBoard>,
}

impl AdminConsole {
    pub fn new(images: ImageAdmin, settings: SettingsAdmin) -> Self {
        Self {
            images,
            settings,
            board: Mutex::new(StatusBoard::new()),
        }
    }

    /// Console over one backend serving both images and settings.
    pub fn from_backend<B>(
        backend: Arc<B>,
        bucket: impl Into<String>,
        table: impl Into<String>,
        context: Arc<SiteContext>,
    ) -> Self
    where
        B: ObjectStore + SettingsStore + 'static,
    {
        let images = ImageAdmin::new(backend.clone(), bucket, context.clone());
        let settings = SettingsAdmin::new(backend, table, context);
        Self::new(images, settings)
    }

    fn board(&self) -> MutexGuard<'_, StatusBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Posts the outcome of an operation. Returns `true` on success.
    fn report<T>(
        &self,
        result: Result<T, AdminError>,
        success: impl FnOnce(&T) -> String,
        failure: &str,
    ) -> bool {
        match result {
            Ok(value) => {
                self.board().success(success(&value));
                true
            }
            Err(e) => {
                warn!(error = %e, "{failure}");
                let title = if e.is_configuration() {
                    "Backend is not set up"
                } else {
                    failure
                };
                self.board().error(title, e.user_message());
                false
            }
        }
    }

    pub fn image_slots(&self) -> Vec<ImageSlot> {
        self.images.current_slots()
    }

    pub fn setting_fields(&self) -> Vec<SettingView> {
        self.settings.current_fields()
    }

    pub async fn upload_image(&self, id: &str, data: Vec<u8>, content_type: &str) -> bool {
        let result = self.images.upload(id, data, content_type).await;
        self.report(result, |_| format!("Image \"{id}\" updated"), "Upload failed")
    }

    pub async fn upload_image_file(&self, id: &str, path: &Path) -> bool {
        let result = self.images.upload_file(id, path).await;
        self.report(result, |_| format!("Image \"{id}\" updated"), "Upload failed")
    }

    pub async fn reset_image(&self, id: &str) -> bool {
        let result = self.images.reset(id).await;
        self.report(
            result,
            |_| format!("Image \"{id}\" restored to default"),
            "Reset failed",
        )
    }

    pub async fn save_setting(&self, key: &str, value: &str) -> bool {
        let result = self.settings.save(key, value).await;
        self.report(result, |_| format!("Setting \"{key}\" saved"), "Save failed")
    }

    pub async fn reset_setting(&self, key: &str) -> bool {
        let result = self.settings.reset(key).await;
        self.report(
            result,
            |_| format!("Setting \"{key}\" restored to default"),
            "Reset failed",
        )
    }

    pub async fn save_settings<'a, I>(&self, changes: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let result = self.settings.save_all(changes).await;
        self.report(result, |saved| format!("{saved} settings saved"), "Save failed")
    }

    /// Snapshot of the messages, oldest first.
    pub fn messages(&self) -> Vec<StatusMessage> {
        self.board().iter().cloned().collect()
    }

    pub fn dismiss(&self, id: u64) -> bool {
        self.board().dismiss(id)
    }

    pub fn has_errors(&self) -> bool {
        self.board().has_errors()
    }
}
