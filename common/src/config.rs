use crate::query::PageLimits;
use crate::validation::UnknownFields;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Origins the bundled web front end is served from during development.
pub const DEFAULT_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Extra CORS origins on top of [`DEFAULT_ORIGINS`].
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Unset means no ceiling on `limit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<u32>,
    #[serde(default = "default_forbid_unknown_fields")]
    pub forbid_unknown_fields: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: None,
            forbid_unknown_fields: default_forbid_unknown_fields(),
        }
    }
}

impl ApiConfig {
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_size: self.default_page_size,
            max_size: self.max_page_size,
        }
    }

    pub fn unknown_fields(&self) -> UnknownFields {
        if self.forbid_unknown_fields {
            UnknownFields::Reject
        } else {
            UnknownFields::Strip
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_database_url() -> String { "sqlite://incidents.db".to_string() }
fn default_max_connections() -> u32 { 5 }
fn default_page_size() -> u32 { 10 }
fn default_forbid_unknown_fields() -> bool { true }

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let config: Config = toml::from_str(&content).with_context(|| format!("parsing config {path}"))?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise the built-in defaults, then
    /// applies environment overrides.
    pub fn load_or_default(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn default_path() -> String {
        std::env::var("TRACKER_CONFIG")
            .unwrap_or_else(|_| "./config/default.toml".to_string())
    }

    /// `DATABASE_URL`, `PORT` and `FRONTEND_URL` take precedence over the file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("DATABASE_URL").filter(|s| !s.is_empty()) {
            self.storage.database_url = url;
        }
        if let Some(port) = var("PORT").filter(|s| !s.is_empty()) {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {port:?}"))?;
        }
        if let Some(origin) = var("FRONTEND_URL").filter(|s| !s.is_empty()) {
            if !self.server.allowed_origins.contains(&origin) {
                self.server.allowed_origins.push(origin);
            }
        }
        Ok(())
    }

    /// Every origin CORS should accept, defaults first, without duplicates.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect();
        for origin in &self.server.allowed_origins {
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
        origins
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [api]
            forbid_unknown_fields = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.api.default_page_size, 10);
        assert_eq!(config.api.unknown_fields(), UnknownFields::Strip);
        assert_eq!(config.api.page_limits().max_size, None);
    }

    #[test]
    fn page_ceiling_is_opt_in() {
        let config: Config = toml::from_str("[api]\nmax_page_size = 250\n").unwrap();
        assert_eq!(config.api.page_limits().max_size, Some(250));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "sqlite::memory:"),
            ("PORT", "4000"),
            ("FRONTEND_URL", "https://incidents.example.com"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.storage.database_url, "sqlite::memory:");
        assert_eq!(config.listen_addr(), "0.0.0.0:4000");
        assert_eq!(
            config.allowed_origins(),
            vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "https://incidents.example.com".to_string(),
            ]
        );
    }

    #[test]
    fn bad_port_is_an_error() {
        let mut config = Config::default();
        assert!(config.apply_env(|k| (k == "PORT").then(|| "http".to_string())).is_err());
    }
}
