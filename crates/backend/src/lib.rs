//! Remote collaborators of the clinic site: object store and settings table.
//!
//! The site only ever talks to its backend through the two traits in
//! [`store`]. [`Client`] implements both against the backend's HTTP API;
//! [`MemoryBackend`] implements both in-process for offline previews and
//! tests.

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use client::{Client, ClientConfig};
pub use error::Error;
pub use memory::MemoryBackend;
pub use store::{ObjectStore, SettingsStore, SparseRecord, StoreFuture};
