//! # sentinel-settings
//!
//! Configuration management with layered sources for the sentinel pipeline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`SentinelSettings::default()`]
//! 2. **User file** — `~/.sentinel/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `SENTINEL_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use sentinel_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("serving on port {}", settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton, initialized on first access via
/// [`get_settings`]. If loading fails, compiled defaults are used.
static SETTINGS: OnceLock<SentinelSettings> = OnceLock::new();

/// Get the global settings instance.
pub fn get_settings() -> &'static SentinelSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: SentinelSettings) -> std::result::Result<(), SentinelSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
