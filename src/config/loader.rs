//! Configuration loading from disk.

use std::path::Path;
use crate::config::schema::RuntimeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable consulted when no config path is passed on the command line.
pub const CONFIG_FILEPATH_ENV_VAR: &str = "FIMIPROXY_CONFIG_FILEPATH";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
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

/// Parse and validate configuration from a JSON string.
pub fn parse_config(content: &str) -> Result<RuntimeConfig, ConfigError> {
    let config: RuntimeConfig = serde_json::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a JSON file.
pub async fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path).await?;
    let config = parse_config(&content)?;

    tracing::info!(
        path = %path.display(),
        routes = config.routes.len(),
        "Configuration loaded"
    );
    Ok(config)
}
