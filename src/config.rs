//! Configuration loading for the Proxmox MCP server.
//!
//! The server reads a single JSON file whose path comes from the
//! `PROXMOX_MCP_CONFIG` environment variable (or `--config`). String values
//! may reference environment variables as `${VAR}` so API tokens can be kept
//! out of the file itself.

use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "PROXMOX_MCP_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub proxmox: ProxmoxConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the Proxmox VE API endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxmoxConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

/// API token credentials (`user@realm` + token name/value).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub user: String,
    pub token_name: String,
    pub token_value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Optional log file; stderr is used when absent (stdout carries MCP).
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

fn default_port() -> u16 {
    8006
}

fn default_verify_ssl() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug)]
pub enum ConfigError {
    /// Neither `--config` nor `PROXMOX_MCP_CONFIG` supplied a path.
    PathNotSet,
    /// The file could not be read.
    Io(PathBuf, String),
    /// The file is not valid JSON or does not match the expected shape.
    InvalidJson(String),
    /// A required field is missing or empty.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::PathNotSet => write!(
                f,
                "config path must be provided via --config or the {} environment variable",
                CONFIG_ENV_VAR
            ),
            ConfigError::Io(path, msg) => {
                write!(f, "failed to read config {}: {}", path.display(), msg)
            }
            ConfigError::InvalidJson(msg) => write!(f, "invalid JSON in config file: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Resolve the config path from the environment.
pub fn resolve_config_path() -> Result<PathBuf, ConfigError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(p) if !p.is_empty() => Ok(PathBuf::from(p)),
        _ => Err(ConfigError::PathNotSet),
    }
}

/// Load, expand and validate the configuration at `path`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
    let cfg: Config =
        serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
    let cfg = expand_config(cfg);
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.proxmox.host.is_empty() {
        return Err(ConfigError::Invalid("proxmox host cannot be empty".into()));
    }
    if cfg.auth.user.is_empty() {
        return Err(ConfigError::Invalid("auth user cannot be empty".into()));
    }
    if cfg.auth.token_name.is_empty() || cfg.auth.token_value.is_empty() {
        return Err(ConfigError::Invalid(
            "auth token_name and token_value cannot be empty".into(),
        ));
    }
    Ok(())
}

fn expand_config(mut cfg: Config) -> Config {
    cfg.proxmox.host = expand_env_vars(&cfg.proxmox.host);
    cfg.auth.user = expand_env_vars(&cfg.auth.user);
    cfg.auth.token_name = expand_env_vars(&cfg.auth.token_name);
    cfg.auth.token_value = expand_env_vars(&cfg.auth.token_value);
    cfg
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}
