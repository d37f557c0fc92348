//! Internal resolution errors.
//!
//! These never leave the crate: every one of them is collapsed into the
//! slot's default path before a result is returned.

use clinicsite_backend::Error as BackendError;

/// Why a slot fell back to its default.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ResolutionError {
    #[error("store issued no URL")]
    NoDescriptor,

    #[error("object does not exist")]
    NotFound,

    #[error("URL lookup failed: {0}")]
    Lookup(#[source] BackendError),

    #[error("existence probe failed: {0}")]
    Probe(#[source] BackendError),

    #[error("backend call timed out")]
    Timeout,

    #[error("resolution deadline exceeded")]
    DeadlineExceeded,

    #[error("resolution panicked")]
    Panicked,
}

impl ResolutionError {
    /// Whether this is the steady state of a slot without an override.
    pub(crate) fn is_expected(&self) -> bool {
        matches!(self, ResolutionError::NoDescriptor | ResolutionError::NotFound)
    }
}
