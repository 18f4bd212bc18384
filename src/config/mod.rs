//! Configuration module for the bridge server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use livebridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod validation;
mod yaml;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the bridge server:
/// - Server settings (host, port, TLS)
/// - Gemini Live API key and session defaults (model, voice, language,
///   system instruction, greeting)
/// - Debug audio recording directory
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Gemini API key for the Live API
    pub gemini_api_key: Option<String>,

    // Session defaults, overridable per session via the start message
    /// Default model resource name
    pub default_model: String,
    /// Default prebuilt voice name
    pub default_voice: String,
    /// Default BCP-47 language code for synthesized speech
    pub default_language_code: Option<String>,
    /// Default system instruction for the assistant
    pub default_instructions: Option<String>,
    /// Opening text turn sent right after a session is established
    pub greeting: Option<String>,

    /// Directory for debug WAV recordings of model audio
    /// Default: None (recording disabled)
    pub record_dir: Option<PathBuf>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

/// Implement Drop to zeroize the API key when ServerConfig is dropped.
/// This ensures sensitive data is cleared from memory immediately after use.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only.
    ///
    /// Note: a .env file, if any, is loaded in main.rs at application
    /// startup so its values appear as ordinary environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string in the format "host:port".
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled.
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Get the Gemini API key, or an error message when not configured.
    pub fn get_gemini_api_key(&self) -> Result<String, String> {
        self.gemini_api_key
            .as_ref()
            .cloned()
            .ok_or_else(|| "Gemini API key not configured in server environment".to_string())
    }

    /// Redacted form of the API key for logging.
    pub fn redacted_api_key(&self) -> String {
        match self.gemini_api_key.as_deref() {
            Some(key) if key.len() > 8 => format!("{}...{}", &key[..4], &key[key.len() - 4..]),
            Some(_) => "***".to_string(),
            None => "<unset>".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            gemini_api_key: None,
            default_model: "models/gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            default_voice: "Zephyr".to_string(),
            default_language_code: None,
            default_instructions: None,
            greeting: None,
            record_dir: None,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ServerConfig implements Drop (key zeroization), so struct update
    // syntax is unavailable; tests mutate a default instead.

    #[test]
    fn test_address_format() {
        let mut config = ServerConfig::default();
        config.host = "localhost".to_string();
        config.port = 8080;
        assert_eq!(config.address(), "localhost:8080");
    }

    #[test]
    fn test_tls_detection() {
        let config = ServerConfig::default();
        assert!(!config.is_tls_enabled());

        let mut config = ServerConfig::default();
        config.tls = Some(TlsConfig {
            cert_path: PathBuf::from("cert.pem"),
            key_path: PathBuf::from("key.pem"),
        });
        assert!(config.is_tls_enabled());
    }

    #[test]
    fn test_get_gemini_api_key() {
        let mut config = ServerConfig::default();
        config.gemini_api_key = Some("AIza-test".to_string());
        assert_eq!(config.get_gemini_api_key().unwrap(), "AIza-test");

        let config = ServerConfig::default();
        assert!(config.get_gemini_api_key().is_err());
    }

    #[test]
    fn test_redacted_api_key() {
        let mut config = ServerConfig::default();
        config.gemini_api_key = Some("AIzaSyExampleKey1234".to_string());
        let redacted = config.redacted_api_key();
        assert!(redacted.starts_with("AIza"));
        assert!(redacted.contains("..."));
        assert!(!redacted.contains("ExampleKey"));

        let mut config = ServerConfig::default();
        config.gemini_api_key = Some("short".to_string());
        assert_eq!(config.redacted_api_key(), "***");

        let config = ServerConfig::default();
        assert_eq!(config.redacted_api_key(), "<unset>");
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.default_voice, "Zephyr");
        assert_eq!(config.rate_limit_requests_per_second, 60);
        assert_eq!(config.max_connections_per_ip, 100);
        assert!(config.max_websocket_connections.is_none());
        assert!(config.record_dir.is_none());
    }
}
