//! YAML configuration file loading.
//!
//! Every field is optional; anything left unset falls back to the
//! environment value or the built-in default during the merge step.
//!
//! # Example YAML
//! ```yaml
//! host: 0.0.0.0
//! port: 3001
//! gemini_api_key: "AIza..."
//! default_voice: Zephyr
//! default_language_code: en-US
//! greeting: "Hello! How can I help you today?"
//! cors_allowed_origins: "*"
//! max_websocket_connections: 500
//! ```

use serde::Deserialize;
use std::path::PathBuf;

/// Raw configuration values read from a YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct YamlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    pub gemini_api_key: Option<String>,
    pub default_model: Option<String>,
    pub default_voice: Option<String>,
    pub default_language_code: Option<String>,
    pub default_instructions: Option<String>,
    pub greeting: Option<String>,
    pub record_dir: Option<PathBuf>,
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load and parse a YAML configuration file.
    pub(crate) fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }
}
