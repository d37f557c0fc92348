//! Error types for admin mutations.

use clinicsite_backend::Error as BackendError;

/// Errors produced by admin mutations.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("storage bucket {0} does not exist")]
    MissingBucket(String),

    #[error("settings table {0} does not exist")]
    MissingTable(String),

    #[error("unknown image slot: {0}")]
    UnknownImage(String),

    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(#[source] BackendError),
}

impl AdminError {
    /// Classifies a storage failure, recognising a missing bucket.
    pub fn from_storage(err: BackendError, bucket: &str) -> Self {
        if err.is_missing_container() {
            AdminError::MissingBucket(bucket.to_string())
        } else {
            AdminError::Backend(err)
        }
    }

    /// Classifies a settings table failure, recognising a missing table.
    pub fn from_table(err: BackendError, table: &str) -> Self {
        if err.is_missing_container() {
            AdminError::MissingTable(table.to_string())
        } else {
            AdminError::Backend(err)
        }
    }

    /// Whether the failure is a backend configuration problem rather than
    /// a transient or input error.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AdminError::MissingBucket(_) | AdminError::MissingTable(_)
        )
    }

    /// Operator-facing explanation.
    pub fn user_message(&self) -> String {
        match self {
            AdminError::MissingBucket(bucket) => format!(
                "The storage bucket \"{bucket}\" does not exist. Create it in the backend before uploading images."
            ),
            AdminError::MissingTable(table) => format!(
                "The settings table \"{table}\" does not exist. Create it in the backend before saving settings."
            ),
            AdminError::UnknownImage(id) => format!("There is no image slot called \"{id}\"."),
            AdminError::UnknownSetting(key) => format!("There is no setting called \"{key}\"."),
            AdminError::InvalidUpload(reason) => format!("The file was not accepted: {reason}."),
            AdminError::Io(e) => format!("The file could not be read: {e}."),
            AdminError::Backend(e) => format!("The request failed: {e}. Please try again."),
        }
    }
}
