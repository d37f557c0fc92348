//! Admin console logic: image overrides, settings overrides, status messages.
//!
//! This crate implements the **mutation path** of the site. It has no UI;
//! a front end drives [`AdminConsole`] and renders its [`StatusBoard`].
//!
//! # Operations
//!
//! - **Images**: list slots, upload an override, reset a slot to its default
//! - **Settings**: list fields, save a value, reset a value to its default
//!
//! Every successful mutation refreshes the shared [`SiteContext`] so the
//! site picks up the change without remounting consumers.
//!
//! [`SiteContext`]: clinicsite_context::SiteContext

pub mod console;
pub mod error;
pub mod images;
pub mod media;
pub mod settings;
pub mod status;

// Re-export primary types for convenience.
pub use console::AdminConsole;
pub use error::AdminError;
pub use images::{ImageAdmin, ImageSlot};
pub use settings::{SettingView, SettingsAdmin};
pub use status::{StatusBoard, StatusKind, StatusMessage};
