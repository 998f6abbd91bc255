//! Proxy configuration
//!
//! Configuration is layered:
//! - Built-in defaults matching the reference deployment
//! - An optional YAML file (`--config`, or `~/.config/toolproxy/config.yaml`)
//! - Environment variable overrides (`LLAMA_BACKEND`, `TOOLPROXY_*`)

mod file;
mod env;

pub use file::{
    BackendSettings, OrchestrationSettings, PolicySettings, ProxyConfig, ServerSettings,
    ToolSettings,
};
pub use env::{
    ENV_BACKEND_URL, ENV_BIND, ENV_DATA_DIR, ENV_MAX_TOOL_ROUNDS, ENV_POLICY_DIR, ENV_REQUEST_TIMEOUT,
    ENV_SYSTEM_PROMPT,
};

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration error: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
