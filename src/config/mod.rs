// src/config/mod.rs

//! Configuration loading and validation.
//!
//! The config file is a TOML document. The whole document, with the package
//! descriptor mounted at `pkg`, forms the Config Tree whose `<%= ... %>`
//! placeholders are resolved once at load time. The typed sections
//! (`[config]`, `[task]`, `[pipeline]`, `[[watch]]`, `[server]`) are then read
//! from the resolved tree and validated.

pub mod loader;
pub mod model;
pub mod package;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigFile, ConfigSection, ConfigSource, RawConfigFile, ServerSection, TaskConfig,
    WatchRuleConfig, CONFIG_VALIDATE_TASK, CONFIG_WATCH_RULE,
};
pub use package::PackageDescriptor;
pub use validate::validate_config;
