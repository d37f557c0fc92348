//! Shared read model of resolved site images and settings.
//!
//! A [`SiteContext`] is built once at application start and handed to
//! every consumer. It owns the resolved image map and settings record,
//! publishes each new resolution pass wholesale, and makes its lifecycle
//! explicit: [`init`](SiteContext::init), [`refresh`](SiteContext::refresh),
//! [`dispose`](SiteContext::dispose).

pub mod context;
pub mod model;

// Re-export primary types for convenience.
pub use context::SiteContext;
pub use model::{Pass, Phase, ReadModel, Snapshot};
