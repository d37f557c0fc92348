//! Error types for backend operations.

/// Errors from the object store and settings table.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API key")]
    InvalidKey,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("backend offline")]
    Offline,
}

impl Error {
    /// Whether the error means the bucket or table itself does not exist.
    ///
    /// Storage answers a missing bucket with a 400/404 whose body names the
    /// bucket; the table API reports `42P01` (relation does not exist) or
    /// `PGRST205` (table not in schema cache).
    pub fn is_missing_container(&self) -> bool {
        match self {
            Error::Api { status, body } => {
                let body = body.to_ascii_lowercase();
                let storage_missing = matches!(status, 400 | 404)
                    && body.contains("bucket")
                    && body.contains("not found");
                let table_missing = body.contains("42p01")
                    || body.contains("pgrst205")
                    || (body.contains("relation") && body.contains("does not exist"));
                storage_missing || table_missing
            }
            _ => false,
        }
    }

    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
