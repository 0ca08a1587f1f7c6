//! Configuration sections for the testing platform.
//!
//! [`Config::load`] layers three sources, later ones winning:
//!
//! 1. built-in defaults (the `#[serde(default)]` values below)
//! 2. an optional YAML, TOML, or JSON file
//! 3. environment variables (`DB_HOST`, `API_BASE_URL`, ...)
//!
//! Every section is a plain immutable struct once loaded; call
//! [`Config::validate`] before handing sections to collaborators.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database host name.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// libpq-style SSL mode (`disable`, `prefer`, `require`, ...).
    pub ssl_mode: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// Connections allowed beyond `pool_size` under load.
    pub max_overflow: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "taap_db".to_string(),
            user: "taap_user".to_string(),
            password: String::new(),
            ssl_mode: "prefer".to_string(),
            pool_size: 10,
            max_overflow: 20,
        }
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis host name.
    pub host: String,
    /// Redis port.
    pub port: u16,
    /// Logical database index.
    pub db: u32,
    /// Optional AUTH password.
    pub password: Option<String>,
    /// Socket timeout in seconds.
    pub socket_timeout: u64,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl RedisConfig {
    /// Get the socket timeout as a `Duration`.
    #[must_use]
    pub const fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
            socket_timeout: 5,
            max_connections: 50,
        }
    }
}

/// HTTP API client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto.
    pub base_url: String,
    /// Per-attempt timeout in seconds.
    pub timeout: u64,
    /// Retries after the first attempt (`retries + 1` attempts in total).
    pub retries: u32,
    /// Requests admitted per 60-second window.
    pub rate_limit: u32,
    /// Bearer token sent as `Authorization` when set.
    pub auth_token: Option<String>,
    /// Whether TLS certificates are verified.
    pub verify_ssl: bool,
}

impl ApiConfig {
    /// Length of the rate-limit window.
    pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

    /// Create a config for `base_url` with every other field defaulted.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Get the per-attempt timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Check the values an API client depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the base URL is empty or not an
    /// absolute http(s) URL, or if `timeout` or `rate_limit` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("api.base_url", "API base URL is required"));
        }
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("api.base_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "api.base_url",
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }
        if self.timeout == 0 {
            return Err(ConfigError::invalid("api.timeout", "must be positive"));
        }
        if self.rate_limit == 0 {
            return Err(ConfigError::invalid("api.rate_limit", "must be positive"));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: 30,
            retries: 3,
            rate_limit: 100,
            auth_token: None,
            verify_ssl: true,
        }
    }
}

/// Container orchestration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Docker daemon address.
    pub docker_host: String,
    /// Path to a kubeconfig file; `None` means in-cluster or default.
    pub k8s_config_path: Option<String>,
    /// Kubernetes namespace for test workloads.
    pub namespace: String,
    /// Registry images are pulled from.
    pub registry_url: String,
    /// Kubernetes image pull policy.
    pub pull_policy: String,
    /// Default resource limits applied to test containers.
    pub resource_limits: BTreeMap<String, String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            docker_host: "unix://var/run/docker.sock".to_string(),
            k8s_config_path: None,
            namespace: "default".to_string(),
            registry_url: "docker.io".to_string(),
            pull_policy: "IfNotPresent".to_string(),
            resource_limits: BTreeMap::from([
                ("cpu".to_string(), "500m".to_string()),
                ("memory".to_string(), "512Mi".to_string()),
            ]),
        }
    }
}

/// Monitoring and observability settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Prometheus server URL.
    pub prometheus_url: String,
    /// Grafana URL.
    pub grafana_url: String,
    /// Jaeger collector URL.
    pub jaeger_url: String,
    /// Log level name (`DEBUG`, `INFO`, ...).
    pub log_level: String,
    /// Whether metrics are collected.
    pub metrics_enabled: bool,
    /// Whether traces are exported.
    pub tracing_enabled: bool,
}

impl MonitoringConfig {
    /// The log level as a lowercase `tracing` filter directive.
    #[must_use]
    pub fn log_filter(&self) -> String {
        match self.log_level.to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            other => other.to_string(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_url: "http://localhost:9090".to_string(),
            grafana_url: "http://localhost:3000".to_string(),
            jaeger_url: "http://localhost:14268".to_string(),
            log_level: "INFO".to_string(),
            metrics_enabled: true,
            tracing_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// All configuration sections of the testing platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `database` section.
    pub database: DatabaseConfig,
    /// `redis` section.
    pub redis: RedisConfig,
    /// `api` section.
    pub api: ApiConfig,
    /// `container` section.
    pub container: ContainerConfig,
    /// `monitoring` section.
    pub monitoring: MonitoringConfig,
}

impl Config {
    /// Load defaults, then `path` (if given), then the process environment.
    ///
    /// A missing file is not an error: a warning is logged and the defaults
    /// are kept. The file format is inferred from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file exists but cannot be parsed,
    /// or [`ConfigError::InvalidEnv`] if a numeric environment override is
    /// malformed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Load defaults overlaid with a single file, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file exists but cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Apply environment overrides from an explicit map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a numeric override is malformed.
    pub fn with_env_overrides(mut self, env: &HashMap<String, String>) -> Result<Self> {
        self.apply_env(|var| env.get(var).cloned())?;
        Ok(self)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let string = |var: &str, target: &mut String| {
            if let Some(value) = lookup(var) {
                *target = value;
            }
        };
        string("DB_HOST", &mut self.database.host);
        string("DB_NAME", &mut self.database.name);
        string("DB_USER", &mut self.database.user);
        string("DB_PASSWORD", &mut self.database.password);
        string("REDIS_HOST", &mut self.redis.host);
        string("API_BASE_URL", &mut self.api.base_url);
        string("K8S_NAMESPACE", &mut self.container.namespace);

        if let Some(port) = parse_env(&lookup, "DB_PORT")? {
            self.database.port = port;
        }
        if let Some(port) = parse_env(&lookup, "REDIS_PORT")? {
            self.redis.port = port;
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            self.redis.password = Some(password);
        }
        if let Some(token) = lookup("API_AUTH_TOKEN") {
            self.api.auth_token = Some(token);
        }
        if let Some(path) = lookup("KUBECONFIG") {
            self.container.k8s_config_path = Some(path);
        }
        Ok(())
    }

    /// Validate cross-section requirements.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.database.host.is_empty() {
            return Err(ConfigError::invalid("database.host", "Database host is required"));
        }
        if self.database.port == 0 {
            return Err(ConfigError::invalid("database.port", "Invalid database port"));
        }
        if self.redis.port == 0 {
            return Err(ConfigError::invalid("redis.port", "Invalid Redis port"));
        }
        self.api.validate()
    }

    /// Render every section as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        // Plain structs of strings and integers always serialize.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn parse_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>> {
    lookup(var)
        .map(|value| {
            value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            })
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
