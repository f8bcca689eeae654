//! Configuration storage and platform paths.

pub mod config;
pub mod paths;

pub use config::{
    AzureSettings, CapacityConfig, ConfigSource, ENV_CONFIG, ENV_SUBSCRIPTION_ID, RequestSettings,
    resolve_config_path,
};
pub use paths::AppPaths;
