//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, HttpConfig, CacheConfig, LogConfig)
//! - [`source`]: Upstream backend selection (SourceConfig and one block per backend)
//! - [`env`]: Environment variable overrides applied after loading
//! - [`validation`]: Startup checks returning every problem found

mod defaults;
mod env;
mod source;
mod types;
mod validation;

pub use source::{FileSourceConfig, ServerQueryConfig, SourceConfig, SshConfig, WebQueryConfig};
pub use types::{CacheConfig, Config, ConfigError, HttpConfig, LogConfig, LogFormat};
pub use validation::{ValidationError, validate};
