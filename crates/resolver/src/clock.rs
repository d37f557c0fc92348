//! Cache-busting timestamps.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use clinicsite_registry::constants::CACHE_BUST_PARAM;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Issues cache-busting stamps that never go backwards, even when the
/// wall clock is stepped back between passes.
pub struct CacheBuster {
    clock: Arc<dyn Clock>,
    last: AtomicI64,
}

impl CacheBuster {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicI64::new(i64::MIN),
        }
    }

    /// Returns a stamp no smaller than any stamp issued before.
    pub fn stamp(&self) -> i64 {
        let now = self.clock.now_millis();
        let prev = self.last.fetch_max(now, Ordering::AcqRel);
        prev.max(now)
    }

    /// Appends the cache-busting parameter to `url`.
    pub fn bust(url: &str, stamp: i64) -> String {
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}{CACHE_BUST_PARAM}={stamp}")
    }
}

impl Default for CacheBuster {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for CacheBuster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuster")
            .field("last", &self.last.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
