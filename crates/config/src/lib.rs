//! Configuration loading and environment overrides.
//!
//! Config files: `svcplug.toml`, `svcplug.yaml`, `svcplug.yml` or
//! `svcplug.json`, searched in `./` then the user config directory.
//!
//! `${ENV_VAR}` placeholders are expanded in the raw file text before it is
//! parsed.

pub mod env;
pub mod loader;
pub mod schema;

pub use {
    env::{apply_env_overrides, expand_placeholders},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{DiscoveryConfig, PathsConfig, RegenerateConfig, ServicesConfig, SvcplugConfig},
};
