//! Resolver configuration.

use std::time::Duration;

use clinicsite_registry::constants::IMAGE_BUCKET;

/// Timeouts and storage location used during resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Bucket holding image overrides.
    pub bucket: String,
    /// Upper bound for each single backend call (lookup, probe, fetch).
    pub per_call_timeout: Duration,
    /// Upper bound for a whole image resolution pass.
    pub deadline: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            bucket: IMAGE_BUCKET.to_string(),
            per_call_timeout: Duration::from_secs(4),
            deadline: Duration::from_secs(10),
        }
    }
}
