//! Config command implementation.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{ConfigCommand, OutputFormat};
use crate::core::models::{ModelQuerySpec, RobotOutput};
use crate::error::Result;
use crate::render::{human, robot};
use crate::storage::config::{AzureSettings, CapacityConfig, resolve_config_path};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigCheck<'a> {
    path: String,
    source: String,
    azure: &'a AzureSettings,
    models: &'a std::collections::BTreeMap<String, ModelQuerySpec>,
    timeout_secs: u64,
    retry_attempts: u32,
    retry_delay_secs: f64,
    max_concurrency: usize,
}

/// Execute a config subcommand.
///
/// # Errors
///
/// Returns the `ConfigurationError` if the file is missing or invalid.
pub fn execute(
    cmd: &ConfigCommand,
    config_path: Option<&Path>,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    match cmd {
        ConfigCommand::Check => {
            let (path, source) = resolve_config_path(config_path);
            let config = CapacityConfig::load_from(&path)?;

            let output = match format {
                OutputFormat::Json => {
                    let settings = &config.request_settings;
                    let check = ConfigCheck {
                        path: path.display().to_string(),
                        source: source.to_string(),
                        azure: &config.azure,
                        models: &config.models,
                        timeout_secs: settings.timeout.as_secs(),
                        retry_attempts: settings.retry_attempts,
                        retry_delay_secs: settings.retry_delay.as_secs_f64(),
                        max_concurrency: settings.max_concurrency,
                    };
                    robot::render_json(&RobotOutput::new("config-check", check, vec![]), pretty)?
                }
                OutputFormat::Human | OutputFormat::Md => {
                    human::render_config_check(&config, &path, source, no_color)
                }
            };
            println!("{output}");
            Ok(())
        }
    }
}
