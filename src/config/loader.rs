//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::DriverConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the node endpoint.
pub const RPC_URL_ENV_VAR: &str = "RPC_URL";

/// Environment variable holding the contract address.
pub const CONTRACT_ADDRESS_ENV_VAR: &str = "CONTRACT_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub contract_address: Option<String>,
    pub log_level: Option<String>,
}

/// Load a TOML file, or defaults when no path is given.
pub fn load_file(path: Option<&Path>) -> Result<DriverConfig, ConfigError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        }
        None => Ok(DriverConfig::default()),
    }
}

/// Overlay environment values using `lookup` (normally `std::env::var`).
pub fn apply_env<F>(config: &mut DriverConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(RPC_URL_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        config.chain.rpc_url = url;
    }
    if let Some(address) = lookup(CONTRACT_ADDRESS_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        config.chain.contract_address = address;
    }
}

/// Overlay command line values.
pub fn apply_overrides(config: &mut DriverConfig, overrides: &ConfigOverrides) {
    if let Some(url) = &overrides.rpc_url {
        config.chain.rpc_url = url.clone();
    }
    if let Some(address) = &overrides.contract_address {
        config.chain.contract_address = address.clone();
    }
    if let Some(level) = &overrides.log_level {
        config.observability.log_level = level.clone();
    }
}

/// Load, merge and validate configuration.
///
/// Precedence: defaults < file < environment < command line.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<DriverConfig, ConfigError> {
    let mut config = load_file(path)?;
    apply_env(&mut config, |key| std::env::var(key).ok());
    apply_overrides(&mut config, overrides);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
