//! CLI configuration.
//!
//! Stored as JSON at `$XDG_CONFIG_HOME/clinicsite/config.json`. The backend
//! URL and key can be overridden from the environment so the file never
//! has to hold a key on shared machines.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clinicsite_backend::ClientConfig;
use clinicsite_registry::constants::{IMAGE_BUCKET, SETTINGS_TABLE};
use clinicsite_resolver::ResolverConfig;
use serde::{Deserialize, Serialize};

const ENV_BACKEND_URL: &str = "CLINICSITE_BACKEND_URL";
const ENV_ANON_KEY: &str = "CLINICSITE_ANON_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Backend root, e.g. `https://abc.example.co`.
    pub backend_url: String,

    /// Public (anon) API key.
    pub anon_key: String,

    pub image_bucket: String,

    pub settings_table: String,

    /// Timeout for each backend request.
    pub request_timeout_ms: u64,

    /// Upper bound for a whole image resolution pass.
    pub resolution_deadline_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let resolver = ResolverConfig::default();
        Self {
            backend_url: String::new(),
            anon_key: String::new(),
            image_bucket: IMAGE_BUCKET.into(),
            settings_table: SETTINGS_TABLE.into(),
            request_timeout_ms: resolver.per_call_timeout.as_millis() as u64,
            resolution_deadline_ms: resolver.deadline.as_millis() as u64,
        }
    }
}

impl SiteConfig {
    /// Loads the config file, then applies environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Loads `path`. A missing file yields defaults; a malformed one is
    /// logged and also yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Applies non-empty overrides returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
            self.backend_url = url;
        }
        if let Some(key) = lookup(ENV_ANON_KEY).filter(|v| !v.is_empty()) {
            self.anon_key = key;
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, &json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        set_permissions_0600(path);
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_url.is_empty() && !self.anon_key.is_empty()
    }

    /// Per-request timeout. Zero falls back to the default.
    pub fn request_timeout(&self) -> Duration {
        non_zero_ms(
            "request_timeout_ms",
            self.request_timeout_ms,
            ResolverConfig::default().per_call_timeout,
        )
    }

    /// Whole-pass deadline. Zero falls back to the default.
    pub fn resolution_deadline(&self) -> Duration {
        non_zero_ms(
            "resolution_deadline_ms",
            self.resolution_deadline_ms,
            ResolverConfig::default().deadline,
        )
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            bucket: self.image_bucket.clone(),
            per_call_timeout: self.request_timeout(),
            deadline: self.resolution_deadline(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.backend_url, &self.anon_key);
        config.settings_table = self.settings_table.clone();
        config.timeout = self.request_timeout();
        config
    }

    /// Copy safe to print: the key is reduced to its last four characters.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.anon_key.is_empty() {
            let chars: Vec<char> = copy.anon_key.chars().collect();
            let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
            copy.anon_key = format!("…{tail}");
        }
        copy
    }
}

fn non_zero_ms(field: &str, ms: u64, default: Duration) -> Duration {
    if ms == 0 {
        tracing::warn!(
            field,
            default_ms = default.as_millis() as u64,
            "zero timeout in config, using default"
        );
        return default;
    }
    Duration::from_millis(ms)
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// `clinicsite/config.json` under the platform config directory.
pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("clinicsite").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .map(PathBuf::from)
            .context("APPDATA is not set")
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(xdg));
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .context("neither XDG_CONFIG_HOME nor HOME is set")
    }
}
