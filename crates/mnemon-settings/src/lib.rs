//! # mnemon-settings
//!
//! Layered configuration for mnemon.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`MnemonSettings::default()`]
//! 2. **User file**: `~/.mnemon/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `MNEMON_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_path_under_mnemon_home() {
        assert!(settings_path().ends_with(".mnemon/settings.json"));
        assert_eq!(settings_path().parent(), Some(mnemon_home().as_path()));
    }
}
