//! Static site registry: image slots, settings defaults, shared constants.
//!
//! Everything in this crate is known at build time. The resolver, the
//! read model and the admin console all derive their view of the site
//! from these tables, so a slot or setting only has to be declared once.
//!
//! # Contents
//!
//! - **Images**: every logical image slot with its override key in the
//!   object store and its bundled fallback asset
//! - **Settings**: the complete default settings record and the field
//!   descriptors the admin listing is built from

pub mod constants;
pub mod images;
pub mod settings;

// Re-export primary types for convenience.
pub use images::{ImageRecord, Registry, RegistryError, Section};
pub use settings::{
    SETTING_FIELDS, SettingField, SettingGroup, SettingsRecord, default_settings, setting_field,
};
