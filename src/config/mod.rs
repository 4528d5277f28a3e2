//! Configuration management
//!
//! This module handles loading and parsing configuration for the Folio
//! platform. Configuration is read from a `config.yml` file when present;
//! missing values (or a missing file) fall back to sensible defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload configuration (avatars)
    #[serde(default)]
    pub upload: UploadConfig,
    /// Outgoing email configuration (password reset)
    #[serde(default)]
    pub email: EmailConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file is not an error; defaults are used so the server can
    /// start with zero configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/folio.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Upload configuration for avatar images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory where uploaded files are stored
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed content types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl UploadConfig {
    /// Check whether a content type may be uploaded
    pub fn is_type_allowed(&self, content_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == content_type)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "image/webp".to_string(),
    ]
}

/// SMTP configuration for outgoing mail.
///
/// Password reset mail is only sent when a host is configured; otherwise
/// the reset endpoint still answers but logs that mail was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host; empty disables outgoing mail
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    /// From address, e.g. `folio@example.com`
    #[serde(default)]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl EmailConfig {
    /// Check whether outgoing mail is configured
    pub fn is_configured(&self) -> bool {
        !self.smtp_host.is_empty() && !self.from_address.is_empty()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: String::new(),
            from_name: default_from_name(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Folio".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/folio.db");
        assert!(!config.email.is_configured());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("does/not/exist.yml")).expect("load should succeed");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "server:\n  port: 9999\ndatabase:\n  driver: mysql\n  url: mysql://localhost/folio"
        )
        .expect("write config");

        let config = Config::load(file.path()).expect("load should succeed");
        assert_eq!(config.server.port, 9999);
        // Unspecified values fall back to defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "server: [not, a, map]").expect("write config");

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_upload_type_allowed() {
        let config = UploadConfig::default();
        assert!(config.is_type_allowed("image/png"));
        assert!(config.is_type_allowed("image/jpeg"));
        assert!(!config.is_type_allowed("application/pdf"));
    }

    #[test]
    fn test_email_configured() {
        let mut email = EmailConfig::default();
        assert!(!email.is_configured());
        email.smtp_host = "smtp.example.com".into();
        assert!(!email.is_configured());
        email.from_address = "folio@example.com".into();
        assert!(email.is_configured());
    }
}
