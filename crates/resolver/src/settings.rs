//! Settings resolution: remote overrides merged over built-in defaults.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use clinicsite_backend::{SettingsStore, SparseRecord};
use clinicsite_registry::SettingsRecord;
use futures_util::FutureExt;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Resolves the effective settings record.
pub struct SettingsResolver {
    store: Arc<dyn SettingsStore>,
    fetch_timeout: Duration,
}

impl SettingsResolver {
    pub fn new(store: Arc<dyn SettingsStore>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetch_timeout,
        }
    }

    /// Fetches the overrides in one batch and merges them over `defaults`.
    ///
    /// Never fails: if the fetch errors, times out or panics, the failure
    /// is logged and `defaults` is returned unchanged.
    pub async fn resolve_settings(&self, defaults: &SettingsRecord) -> SettingsRecord {
        let fetch = async { timeout(self.fetch_timeout, self.store.get_all()).await };
        let outcome = match AssertUnwindSafe(fetch).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("settings fetch panicked, using defaults");
                return defaults.clone();
            }
        };
        match outcome {
            Ok(Ok(overrides)) => {
                debug!(overrides = overrides.len(), "fetched settings overrides");
                merge_settings(defaults, &overrides)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to fetch settings, using defaults");
                defaults.clone()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "settings fetch timed out, using defaults"
                );
                defaults.clone()
            }
        }
    }
}

/// Shallow-merges remote overrides over `defaults`, key by key.
///
/// Strings are taken as-is, numbers and booleans are stringified. `null`,
/// arrays and objects are skipped so the key keeps its current value.
/// Keys unknown to `defaults` pass through.
pub fn merge_settings(defaults: &SettingsRecord, overrides: &SparseRecord) -> SettingsRecord {
    defaults.overlay(
        overrides
            .iter()
            .filter_map(|(key, value)| normalize(key, value).map(|v| (key.clone(), v))),
    )
}

fn normalize(key: &str, value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => {
            debug!(key, "ignoring non-scalar settings value");
            None
        }
    }
}
