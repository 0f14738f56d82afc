//! Configuration system for the Slipshot client.
//!
//! Provides TOML-based configuration with:
//! - `[server]`, `[session]` and `[cache]` sections, each defaulted independently
//! - Config file layering (user config dir + project-local overrides)
//! - Validation of values that would otherwise fail at request time

pub mod discovery;
pub mod error;
pub mod types;

/// Application name for platform directory resolution.
pub const APP_NAME: &str = "slipshot";

pub use discovery::{
    ConfigSource, LoadedConfig, config_dir, data_dir, load_config, load_config_file,
    load_config_with_options, save_config, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::{
    CacheSection, PREFERENCES_KEY, ServerSection, SessionSection, SlipshotConfig, StoreBackend,
};
