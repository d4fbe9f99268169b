// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: turning a `RawConfigFile` into a checked `ConfigFile`.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::{parse_duration, parse_time_bound};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, DefaultSection, OperatorConfig, RawConfigFile, TaskConfig};
