//! Configuration management

use crate::error::{MediError, MediResult};
use crate::logging::LoggingConfig;
use crate::types::{ApiSettings, MediConfig, SessionSettings};

use std::path::Path;

impl Default for MediConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings {
                base_url: "http://localhost:5002".to_string(),
                timeout_seconds: 30,
                user_agent: "medicopilot/0.1".to_string(),
            },
            session: SessionSettings {
                data_dir: "~/.medicopilot/session".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl MediConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> MediResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MediError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: MediConfig = toml::from_str(&content).map_err(|e| MediError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> MediResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| MediError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| MediError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> MediResult<()> {
        if self.api.base_url.is_empty() {
            return Err(MediError::Config {
                message: "API base_url must not be empty".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set api.base_url to your backend address"),
            });
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(MediError::Config {
                message: format!("API base_url must be an HTTP(S) URL: {}", self.api.base_url),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Use a full URL like http://10.0.16.189:5002"),
            });
        }

        if self.api.timeout_seconds == 0 {
            return Err(MediError::Config {
                message: "API timeout_seconds must be greater than 0".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set api.timeout_seconds to a positive value"),
            });
        }

        if self.logging.level.is_empty() {
            return Err(MediError::Config {
                message: "Logging level must not be empty".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set logging.level to trace, debug, info, warn, or error"),
            });
        }

        if self.session.data_dir.is_empty() {
            return Err(MediError::Config {
                message: "Session data_dir must not be empty".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set session.data_dir to a writable directory"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MediConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut config = MediConfig::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = MediConfig::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_logging_level() {
        let mut config = MediConfig::default();
        config.logging.level = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn logging_section_is_optional_in_config_files() {
        let toml = r#"
            [api]
            base_url = "http://10.0.16.189:5002"
            timeout_seconds = 30
            user_agent = "medicopilot/0.1"

            [session]
            data_dir = "~/.medicopilot/session"
        "#;
        let config: MediConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = MediConfig::default();
        config.api.base_url = "https://medi.example.com".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = MediConfig::from_file(&path).unwrap();
        assert_eq!(loaded.api.base_url, "https://medi.example.com");
        assert_eq!(loaded.api.timeout_seconds, config.api.timeout_seconds);
    }
}
