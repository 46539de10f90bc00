//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use crate::range::UnknownPathPolicy;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.upstream.base_url, "https://api.pwnedpasswords.com");
        assert_eq!(config.padding.min_lines, 10);
        assert_eq!(config.padding.line_span, 200);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_full_file() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9443"
            assume_https = true

            [upstream]
            base_url = "http://127.0.0.1:9000"
            request_timeout_secs = 3

            [validation]
            unknown_path = "not_found"

            [padding]
            min_lines = 20
            line_span = 100

            [cache]
            enabled = false

            [observability]
            log_level = "debug"
            log_format = "json"
            "#,
        )
        .unwrap();

        assert!(config.listener.assume_https);
        assert!(config.listener.trust_forwarded_proto);
        assert_eq!(config.upstream.request_timeout_secs, 3);
        assert_eq!(config.upstream.connect_timeout_secs, 5);
        assert_eq!(config.validation.unknown_path, UnknownPathPolicy::NotFound);
        assert_eq!(config.padding.min_lines, 20);
        assert!(config.padding.enabled);
        assert!(!config.cache.enabled);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_parse_and_validation_errors() {
        assert!(matches!(parse_config("[padding]\nmin_lines = \"many\""), Err(ConfigError::Parse(_))));
        assert!(matches!(
            parse_config("[validation]\nunknown_path = \"teapot\""),
            Err(ConfigError::Parse(_))
        ));

        let err = parse_config("[timeouts]\nrequest_secs = 0").unwrap_err();
        assert!(err.to_string().starts_with("Validation failed: timeouts.request_secs"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/range-proxy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
