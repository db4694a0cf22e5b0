//! TOML-based settings for the panel server.
//!
//! Settings are loaded from `~/.ledpanel/settings.toml` (or `--config`) with
//! environment variable interpolation support.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ledpanel_lib::settings::SettingsManager;
//!
//! let manager = SettingsManager::new().await?;
//! let settings = manager.get();
//! println!("listening on {}:{}", settings.server.host, settings.server.port);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{settings_path, SettingsManager};
pub use schema::LedpanelSettings;
