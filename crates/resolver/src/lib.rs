//! Image and settings resolution with fallback to bundled defaults.
//!
//! Resolution turns the static registry into render-ready values:
//!
//! - **Images**: for every slot, a cache-busted URL of the uploaded
//!   override if it exists, otherwise the slot's bundled default
//! - **Settings**: the built-in default record overlaid with whatever
//!   overrides the settings table holds
//!
//! Resolution never fails. Remote errors, timeouts and missing objects all
//! degrade to defaults, so a broken backend cannot block a page render.

pub mod assets;
pub mod clock;
pub mod config;
mod error;
pub mod map;
pub mod settings;

// Re-export primary types for convenience.
pub use assets::AssetResolver;
pub use clock::{CacheBuster, Clock, SystemClock};
pub use config::ResolverConfig;
pub use map::ImageMap;
pub use settings::{SettingsResolver, merge_settings};
