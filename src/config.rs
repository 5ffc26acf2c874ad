//! Runtime configuration read from the environment (and `.env` when present).

use crate::error::{ClientError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend origin; relative upload paths are resolved against it.
    pub api_url: String,
    /// Directory holding the sled session store.
    pub data_dir: PathBuf,
    /// When set, logs also go to a daily-rolling file in this directory.
    pub log_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("CATALOG_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = normalize_origin(&api_url)?;

        let data_dir = lookup("CATALOG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".catalog_admin"));
        let log_dir = lookup("CATALOG_LOG_DIR").map(PathBuf::from);

        let log_format = match lookup("CATALOG_LOG_FORMAT").as_deref() {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ClientError::Config(format!(
                    "Invalid CATALOG_LOG_FORMAT '{}': expected 'pretty' or 'json'",
                    other
                )))
            }
        };

        Ok(Self {
            api_url,
            data_dir,
            log_dir,
            log_format,
        })
    }

    pub fn with_api_url(mut self, url: &str) -> Result<Self> {
        self.api_url = normalize_origin(url)?;
        Ok(self)
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session")
    }
}

fn normalize_origin(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::Config(format!(
            "Backend URL '{}' must start with http:// or https://",
            url
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.log_dir.is_none());
        assert_eq!(config.session_path(), PathBuf::from(".catalog_admin/session"));
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CATALOG_API_URL", "https://shop.example.com/"),
            ("CATALOG_LOG_FORMAT", "json"),
            ("CATALOG_LOG_DIR", "/tmp/logs"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://shop.example.com");
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("CATALOG_LOG_FORMAT", "xml")])),
            Err(ClientError::Config(_))
        ));
        assert!(config.with_api_url("localhost:8080").is_err());
    }
}
