use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the current directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".devops-pr.toml";

/// Environment variable consulted when the config file carries no token.
pub const TOKEN_ENV_VAR: &str = "OCI_DEVOPS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No DevOps service endpoint configured")]
    MissingEndpoint,

    #[error("Invalid DevOps service endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("No DevOps session token found")]
    MissingToken,
}

/// Top-level configuration loaded from .devops-pr.toml.
///
/// Everything is optional so that a missing file still yields a usable
/// value; missing connection settings only fail once a client is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// DevOps service connection settings
    #[serde(default)]
    pub devops: DevOpsConfig,

    /// Log destination used when not running with --debug
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Repository short name -> provider repository identifier
    #[serde(default)]
    pub repos: BTreeMap<String, String>,

    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevOpsConfig {
    /// Base URL of the DevOps REST API, including the API version segment.
    pub endpoint: Option<String>,
    /// Session token. If None, falls back to OCI_DEVOPS_TOKEN.
    pub token: Option<String>,
    /// Principal added as a reviewer before approving.
    pub user_id: Option<String>,
    pub timeout_secs: u64,
    /// Extra attempts for read operations on transient failures.
    pub retries: u32,
    /// Upper bound on concurrent diff fetches while listing.
    pub diff_concurrency: usize,
}

impl Default for DevOpsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            user_id: None,
            timeout_secs: 30,
            retries: 2,
            diff_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("devops-pr.log"),
        }
    }
}

/// Connection settings validated for building an HTTP gateway.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoint: reqwest::Url,
    pub token: String,
    pub timeout: Duration,
    pub retries: u32,
}

impl Config {
    /// Load configuration from an explicit path, or from .devops-pr.toml in
    /// the current directory. Only the implicit file may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Resolve the session token: config file value takes precedence,
    /// falls back to the OCI_DEVOPS_TOKEN env var.
    pub fn devops_token(&self) -> Option<String> {
        self.devops
            .token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
            .filter(|token| !token.trim().is_empty())
    }

    /// Validate the connection settings needed to talk to the service.
    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        let endpoint = self
            .devops
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;
        let url = reqwest::Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "not a base URL".to_string(),
            });
        }
        let token = self.devops_token().ok_or(ConfigError::MissingToken)?;

        Ok(ClientSettings {
            endpoint: url,
            token,
            timeout: Duration::from_secs(self.devops.timeout_secs.max(1)),
            retries: self.devops.retries,
        })
    }

    /// Human-readable name of the file that holds (or would hold) the config.
    pub fn source_display(&self) -> String {
        self.source
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE))
            .display()
            .to_string()
    }
}
