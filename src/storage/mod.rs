//! Configuration storage.

pub mod config;
pub mod paths;

pub use config::{
    Config, ConfigSource, ENV_CONFIG, ENV_PRETTY, ENV_TIMEOUT, ResolvedConfig,
};
pub use paths::AppPaths;
