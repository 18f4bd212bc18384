//! Merging of YAML and environment configuration sources.
//!
//! Priority: YAML > environment variables > defaults. TLS is only
//! enabled when both halves of the certificate pair resolve.

use super::env::EnvConfig;
use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig};

/// Merge environment variables (base) with optional YAML overrides into
/// the final configuration.
pub(crate) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let env = EnvConfig::load()?;
    let yaml = yaml.unwrap_or_default();
    let defaults = ServerConfig::default();

    let cert_path = yaml.tls_cert_path.or(env.tls_cert_path);
    let key_path = yaml.tls_key_path.or(env.tls_key_path);
    let tls = match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path,
            key_path,
        }),
        (None, None) => None,
        _ => {
            return Err(
                "TLS requires both a certificate and a key (tls_cert_path / tls_key_path)".into(),
            );
        }
    };

    Ok(ServerConfig {
        host: yaml.host.or(env.host).unwrap_or(defaults.host.clone()),
        port: yaml.port.or(env.port).unwrap_or(defaults.port),
        tls,
        gemini_api_key: yaml.gemini_api_key.or(env.gemini_api_key),
        default_model: yaml
            .default_model
            .or(env.default_model)
            .unwrap_or(defaults.default_model.clone()),
        default_voice: yaml
            .default_voice
            .or(env.default_voice)
            .unwrap_or(defaults.default_voice.clone()),
        default_language_code: yaml.default_language_code.or(env.default_language_code),
        default_instructions: yaml.default_instructions.or(env.default_instructions),
        greeting: yaml.greeting.or(env.greeting),
        record_dir: yaml.record_dir.or(env.record_dir),
        cors_allowed_origins: yaml.cors_allowed_origins.or(env.cors_allowed_origins),
        rate_limit_requests_per_second: yaml
            .rate_limit_requests_per_second
            .or(env.rate_limit_requests_per_second)
            .unwrap_or(defaults.rate_limit_requests_per_second),
        rate_limit_burst_size: yaml
            .rate_limit_burst_size
            .or(env.rate_limit_burst_size)
            .unwrap_or(defaults.rate_limit_burst_size),
        max_websocket_connections: yaml
            .max_websocket_connections
            .or(env.max_websocket_connections),
        max_connections_per_ip: yaml
            .max_connections_per_ip
            .or(env.max_connections_per_ip)
            .unwrap_or(defaults.max_connections_per_ip),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

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
    fn test_defaults_without_sources() {
        clear_vars();
        let config = merge_config(None).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.default_voice, "Zephyr");
        assert!(config.gemini_api_key.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    #[serial]
    fn test_yaml_overrides_env() {
        clear_vars();
        unsafe {
            env::set_var("PORT", "9000");
            env::set_var("GEMINI_VOICE", "Puck");
        }

        let yaml = YamlConfig {
            port: Some(8443),
            ..Default::default()
        };
        let config = merge_config(Some(yaml)).unwrap();
        // YAML wins for port, env fills what YAML leaves unset
        assert_eq!(config.port, 8443);
        assert_eq!(config.default_voice, "Puck");

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_tls_requires_both_paths() {
        clear_vars();
        unsafe { env::set_var("TLS_CERT_PATH", "/tmp/cert.pem") };

        let result = merge_config(None);
        assert!(result.is_err());

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_tls_pair_enables_tls() {
        clear_vars();
        unsafe {
            env::set_var("TLS_CERT_PATH", "/tmp/cert.pem");
            env::set_var("TLS_KEY_PATH", "/tmp/key.pem");
        }

        let config = merge_config(None).unwrap();
        assert!(config.is_tls_enabled());

        clear_vars();
    }
}
