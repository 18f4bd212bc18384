//! Configuration validation logic.

use super::ServerConfig;

/// Validate the merged configuration before the server starts.
pub(crate) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.gemini_api_key.is_none() {
        return Err("GEMINI_API_KEY is required (set it in the environment, .env or YAML)".into());
    }

    if let Some(ref tls) = config.tls {
        if !tls.cert_path.exists() {
            return Err(format!(
                "TLS certificate file not found: {}",
                tls.cert_path.display()
            )
            .into());
        }
        if !tls.key_path.exists() {
            return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
        }
    }

    if config.max_connections_per_ip == 0 {
        return Err("max_connections_per_ip must be at least 1".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use std::path::PathBuf;

    fn config_with_key() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.gemini_api_key = Some("AIza-test".to_string());
        config
    }

    #[test]
    fn test_api_key_required() {
        let config = ServerConfig::default();
        assert!(validate(&config).is_err());

        assert!(validate(&config_with_key()).is_ok());
    }

    #[test]
    fn test_tls_paths_must_exist() {
        let mut config = config_with_key();
        config.tls = Some(TlsConfig {
            cert_path: PathBuf::from("/nonexistent/cert.pem"),
            key_path: PathBuf::from("/nonexistent/key.pem"),
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_tls_with_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "cert").unwrap();
        std::fs::write(&key, "key").unwrap();

        let mut config = config_with_key();
        config.tls = Some(TlsConfig {
            cert_path: cert,
            key_path: key,
        });
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_per_ip_limit_must_be_positive() {
        let mut config = config_with_key();
        config.max_connections_per_ip = 0;
        assert!(validate(&config).is_err());
    }
}
