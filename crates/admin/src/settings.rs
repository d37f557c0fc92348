//! Settings administration.
//!
//! The remote table only holds keys whose value differs from the built-in
//! default. Saving a value equal to the default deletes the row instead.

use std::sync::Arc;

use clinicsite_backend::SettingsStore;
use clinicsite_context::SiteContext;
use clinicsite_registry::{SETTING_FIELDS, SettingField, SettingGroup, SettingsRecord, setting_field};
use serde::Serialize;
use tracing::info;

use crate::error::AdminError;

/// One row of the admin settings listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingView {
    pub key: &'static str,
    pub label: &'static str,
    pub group: SettingGroup,
    pub value: String,
    pub default: &'static str,
    pub customized: bool,
}

/// Saves and resets settings overrides.
pub struct SettingsAdmin {
    store: Arc<dyn SettingsStore>,
    table: String,
    context: Arc<SiteContext>,
}

impl SettingsAdmin {
    pub fn new(store: Arc<dyn SettingsStore>, table: impl Into<String>, context: Arc<SiteContext>) -> Self {
        Self {
            store,
            table: table.into(),
            context,
        }
    }

    /// Listing of every known setting with its effective value.
    pub fn fields(&self, effective: &SettingsRecord) -> Vec<SettingView> {
        SETTING_FIELDS
            .iter()
            .map(|f| {
                let value = effective.get(f.key).unwrap_or(f.default);
                SettingView {
                    key: f.key,
                    label: f.label,
                    group: f.group,
                    value: value.to_string(),
                    default: f.default,
                    customized: value != f.default,
                }
            })
            .collect()
    }

    /// Listing built from the context's current settings.
    pub fn current_fields(&self) -> Vec<SettingView> {
        self.fields(&self.context.settings().value)
    }

    fn field(key: &str) -> Result<&'static SettingField, AdminError> {
        setting_field(key).ok_or_else(|| AdminError::UnknownSetting(key.to_string()))
    }

    async fn write(&self, field: &SettingField, value: &str) -> Result<(), AdminError> {
        let result = if value == field.default {
            self.store.delete(field.key).await
        } else {
            self.store.upsert(field.key, value).await
        };
        result.map_err(|e| AdminError::from_table(e, &self.table))
    }

    /// Saves one setting and refreshes the site settings.
    pub async fn save(&self, key: &str, value: &str) -> Result<(), AdminError> {
        let field = Self::field(key)?;
        self.write(field, value).await?;
        info!(setting = %key, "saved setting");
        self.context.refresh_settings().await;
        Ok(())
    }

    /// Drops the override for `key` so the default applies again.
    pub async fn reset(&self, key: &str) -> Result<(), AdminError> {
        let field = Self::field(key)?;
        self.write(field, field.default).await?;
        info!(setting = %key, "reset setting to default");
        self.context.refresh_settings().await;
        Ok(())
    }

    /// Saves several settings in order, stopping at the first failure.
    ///
    /// Settings are refreshed once if anything was written, including when
    /// a later change fails. Returns the number of settings saved.
    pub async fn save_all<'a, I>(&self, changes: I) -> Result<usize, AdminError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut saved = 0;
        let mut outcome = Ok(());
        for (key, value) in changes {
            let step = match Self::field(key) {
                Ok(field) => self.write(field, value).await,
                Err(e) => Err(e),
            };
            if let Err(e) = step {
                outcome = Err(e);
                break;
            }
            saved += 1;
        }
        if saved > 0 {
            info!(saved, "saved settings");
            self.context.refresh_settings().await;
        }
        outcome.map(|()| saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinicsite_backend::MemoryBackend;
    use clinicsite_registry::default_settings;
    use clinicsite_resolver::ResolverConfig;

    const TABLE: &str = "site_settings";

    fn setup() -> (Arc<MemoryBackend>, Arc<SiteContext>, SettingsAdmin) {
        let backend = Arc::new(MemoryBackend::new());
        let ctx = Arc::new(SiteContext::from_backend(
            backend.clone(),
            ResolverConfig::default(),
        ));
        let admin = SettingsAdmin::new(backend.clone(), TABLE, ctx.clone());
        (backend, ctx, admin)
    }

    #[test]
    fn listing_follows_field_order() {
        let (_backend, _ctx, admin) = setup();
        let views = admin.fields(&default_settings());
        let keys: Vec<&str> = views.iter().map(|v| v.key).collect();
        let expected: Vec<&str> = SETTING_FIELDS.iter().map(|f| f.key).collect();
        assert_eq!(keys, expected);
        assert!(views.iter().all(|v| !v.customized));
    }

    #[test]
    fn listing_marks_customized() {
        let (_backend, _ctx, admin) = setup();
        let effective = default_settings().overlay([("phone", "+1 555 0100")]);
        let views = admin.fields(&effective);
        let phone = views.iter().find(|v| v.key == "phone").unwrap();
        assert!(phone.customized);
        assert_eq!(phone.value, "+1 555 0100");
    }

    #[tokio::test]
    async fn save_upserts_and_refreshes() {
        let (backend, ctx, admin) = setup();
        admin.save("phone", "+1 555 0100").await.unwrap();

        assert_eq!(backend.settings()["phone"], "+1 555 0100");
        assert_eq!(ctx.setting("phone").as_deref(), Some("+1 555 0100"));
    }

    #[tokio::test]
    async fn saving_default_removes_override() {
        let (backend, ctx, admin) = setup();
        backend.put_setting("tagline", "Old tagline");

        let default = setting_field("tagline").unwrap().default;
        admin.save("tagline", default).await.unwrap();

        assert!(!backend.settings().contains_key("tagline"));
        assert_eq!(ctx.setting("tagline").as_deref(), Some(default));
    }

    #[tokio::test]
    async fn reset_deletes_override() {
        let (backend, ctx, admin) = setup();
        backend.put_setting("email", "old@example.com");
        ctx.init().await;
        assert_eq!(ctx.setting("email").as_deref(), Some("old@example.com"));

        admin.reset("email").await.unwrap();
        assert!(backend.settings().is_empty());
        assert_eq!(
            ctx.setting("email").as_deref(),
            Some(setting_field("email").unwrap().default)
        );
    }

    #[tokio::test]
    async fn unknown_key_rejected() {
        let (backend, _ctx, admin) = setup();
        let err = admin.save("favourite_colour", "blue").await.unwrap_err();
        assert!(matches!(err, AdminError::UnknownSetting(_)));
        assert!(backend.settings().is_empty());
    }

    #[tokio::test]
    async fn missing_table_is_configuration_error() {
        let (backend, _ctx, admin) = setup();
        backend.drop_table();
        let err = admin.save("phone", "1").await.unwrap_err();
        assert!(matches!(err, AdminError::MissingTable(ref t) if t == TABLE));
    }

    #[tokio::test]
    async fn save_all_stops_at_first_failure() {
        let (backend, ctx, admin) = setup();
        let changes = [
            ("phone", "111"),
            ("bogus", "x"),
            ("email", "a@b.c"),
        ];
        let err = admin.save_all(changes).await.unwrap_err();
        assert!(matches!(err, AdminError::UnknownSetting(ref k) if k == "bogus"));

        let stored = backend.settings();
        assert_eq!(stored["phone"], "111");
        assert!(!stored.contains_key("email"));
        assert_eq!(ctx.setting("phone").as_deref(), Some("111"));
    }

    #[tokio::test]
    async fn save_all_counts_saved() {
        let (backend, _ctx, admin) = setup();
        let saved = admin
            .save_all([("phone", "111"), ("email", "a@b.c")])
            .await
            .unwrap();
        assert_eq!(saved, 2);
        assert_eq!(backend.settings().len(), 2);
    }
}
