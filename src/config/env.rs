//! Environment variable loading for server configuration.
//!
//! Reads every recognized environment variable into an `EnvConfig` of
//! optionals. Defaults are applied later, during the merge step.

use std::env;
use std::path::PathBuf;

/// Raw configuration values read from the environment.
#[derive(Debug, Default)]
pub(crate) struct EnvConfig {
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

/// Read a non-empty string environment variable.
fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse a numeric environment variable, failing loudly on a
/// malformed value instead of silently falling back to the default.
fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T::Err: std::fmt::Display,
{
    match get_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name}: {e}").into()),
        None => Ok(None),
    }
}

impl EnvConfig {
    /// Load all recognized environment variables.
    pub(crate) fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            host: get_var("HOST"),
            port: parse_var("PORT")?,
            tls_cert_path: get_var("TLS_CERT_PATH").map(PathBuf::from),
            tls_key_path: get_var("TLS_KEY_PATH").map(PathBuf::from),
            gemini_api_key: get_var("GEMINI_API_KEY"),
            default_model: get_var("GEMINI_MODEL"),
            default_voice: get_var("GEMINI_VOICE"),
            default_language_code: get_var("GEMINI_LANGUAGE_CODE"),
            default_instructions: get_var("SYSTEM_INSTRUCTION"),
            greeting: get_var("GREETING"),
            record_dir: get_var("RECORD_DIR").map(PathBuf::from),
            cors_allowed_origins: get_var("CORS_ALLOWED_ORIGINS"),
            rate_limit_requests_per_second: parse_var("RATE_LIMIT_REQUESTS_PER_SECOND")?,
            rate_limit_burst_size: parse_var("RATE_LIMIT_BURST_SIZE")?,
            max_websocket_connections: parse_var("MAX_WEBSOCKET_CONNECTIONS")?,
            max_connections_per_ip: parse_var("MAX_CONNECTIONS_PER_IP")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        for name in [
            "HOST",
            "PORT",
            "TLS_CERT_PATH",
            "TLS_KEY_PATH",
            "GEMINI_API_KEY",
            "GEMINI_MODEL",
            "GEMINI_VOICE",
            "GEMINI_LANGUAGE_CODE",
            "SYSTEM_INSTRUCTION",
            "GREETING",
            "RECORD_DIR",
            "CORS_ALLOWED_ORIGINS",
            "RATE_LIMIT_REQUESTS_PER_SECOND",
            "RATE_LIMIT_BURST_SIZE",
            "MAX_WEBSOCKET_CONNECTIONS",
            "MAX_CONNECTIONS_PER_IP",
        ] {
            unsafe { env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn test_load_empty_environment() {
        clear_vars();
        let config = EnvConfig::load().unwrap();
        assert!(config.host.is_none());
        assert!(config.port.is_none());
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_load_basic_vars() {
        clear_vars();
        unsafe {
            env::set_var("HOST", "127.0.0.1");
            env::set_var("PORT", "9000");
            env::set_var("GEMINI_API_KEY", "AIza-test");
            env::set_var("GEMINI_VOICE", "Kore");
        }

        let config = EnvConfig::load().unwrap();
        assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.gemini_api_key.as_deref(), Some("AIza-test"));
        assert_eq!(config.default_voice.as_deref(), Some("Kore"));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_numeric_var_is_an_error() {
        clear_vars();
        unsafe { env::set_var("PORT", "not-a-port") };

        let result = EnvConfig::load();
        assert!(result.is_err());

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_empty_value_treated_as_unset() {
        clear_vars();
        unsafe { env::set_var("GEMINI_API_KEY", "  ") };

        let config = EnvConfig::load().unwrap();
        assert!(config.gemini_api_key.is_none());

        clear_vars();
    }
}
