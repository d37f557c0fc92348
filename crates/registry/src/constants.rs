//! Names shared between the site, the resolver and the admin console.

/// Object store bucket holding custom image overrides.
pub const IMAGE_BUCKET: &str = "site-images";

/// Key-value table holding settings overrides.
pub const SETTINGS_TABLE: &str = "site_settings";

/// Query parameter appended to resolved remote URLs.
pub const CACHE_BUST_PARAM: &str = "v";

/// Largest image the admin console accepts for upload (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
