//! # wsgate-settings
//!
//! Layered configuration for the gateway.
//!
//! Settings are resolved from four layers (later layers win):
//! 1. **Compiled defaults**: [`GatewaySettings::default()`]
//! 2. **Base file**: `<config_dir>/application.json`
//! 3. **Profile file**: `<config_dir>/application-<profile>.json`
//! 4. **Environment variables**: `APP_*` overrides
//!
//! # Usage
//!
//! ```no_run
//! use wsgate_settings::load_settings;
//!
//! let settings = load_settings("configs".as_ref(), None).unwrap();
//! println!("listening on port {}", settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, profile_from_env};
pub use types::*;
