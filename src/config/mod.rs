// Configuration module for the foundation model proxy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::bedrock::TOKEN_ENV;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "PROXY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Region used by the invoke routes and as the health check default.
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            region: default_region(),
            log_level: default_log_level(),
            cors: CorsConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CorsConfig {
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_headers")]
    pub allowed_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
            allowed_methods: default_methods(),
            allowed_headers: default_headers(),
        }
    }
}

fn default_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "OPTIONS"].iter().map(|m| m.to_string()).collect()
}

fn default_headers() -> Vec<String> {
    vec!["*".to_string()]
}

/// Where and how to reach the model service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct UpstreamConfig {
    /// Runtime endpoint template; `{region}` is substituted.
    #[serde(default)]
    pub runtime_endpoint: Option<String>,
    /// Control-plane endpoint template; `{region}` is substituted.
    #[serde(default)]
    pub control_endpoint: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl AppConfig {
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    /// Override fields from environment variables, looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = get("HOST") {
            self.host = host;
        }
        if let Some(port) = get("PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: "PORT", value: port })?;
        }
        if let Some(region) = get("AWS_REGION") {
            self.region = region;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        if let Some(origins) = get("ALLOWED_CORS_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if self.upstream.bearer_token.is_none() {
            self.upstream.bearer_token = get(TOKEN_ENV);
        }
        Ok(())
    }
}

/// Load the config file named by `PROXY_CONFIG` (or `config.yaml` when present),
/// then apply environment overrides.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let mut config = match std::env::var(CONFIG_ENV).ok() {
        Some(path) => AppConfig::read(Path::new(&path))?,
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                AppConfig::read(path)?
            } else {
                AppConfig::default()
            }
        }
    };

    config.apply_env(|name| std::env::var(name).ok())?;
    tracing::debug!("Config loaded: host={}, port={}, region={}", config.host, config.port, config.region);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = AppConfig::from_yaml("{}", Path::new("config.yaml")).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.cors.allowed_methods, vec!["GET", "POST", "OPTIONS"]);
        assert!(config.upstream.bearer_token.is_none());
    }

    #[test]
    fn test_read_kebab_case_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port: 9100\nregion: us-west-2\ncors:\n  allowed-origins:\n    - https://play.example.com\nupstream:\n  runtime-endpoint: http://127.0.0.1:4566\n"
        )
        .unwrap();

        let config = AppConfig::read(file.path()).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.cors.allowed_origins, vec!["https://play.example.com"]);
        assert_eq!(
            config.upstream.runtime_endpoint.as_deref(),
            Some("http://127.0.0.1:4566")
        );
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = AppConfig::read(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("here.yaml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "8080"),
            ("AWS_REGION", "eu-central-1"),
            ("LOG_LEVEL", "DEBUG"),
            ("ALLOWED_CORS_ORIGINS", "http://a.test, http://b.test,"),
            (TOKEN_ENV, "secret"),
        ]);

        let mut config = AppConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.cors.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.upstream.bearer_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_file_token_wins_over_env() {
        let mut config = AppConfig::default();
        config.upstream.bearer_token = Some("from-file".to_string());
        config
            .apply_env(|name| (name == TOKEN_ENV).then(|| "from-env".to_string()))
            .unwrap();
        assert_eq!(config.upstream.bearer_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|name| (name == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "PORT", .. }));
    }
}
