//! YAML configuration file model

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult};
use crate::policy::TenantPolicy;

/// Top-level proxy configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub policy: PolicySettings,
    pub tools: ToolSettings,
    pub orchestration: OrchestrationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:80".to_string(),
        }
    }
}

/// Upstream chat-completion backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Full chat-completions URL of the backend
    pub url: String,
    /// Per-call deadline in seconds
    pub timeout_secs: u64,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    /// Delay before the first retry; later retries wait proportionally longer
    pub retry_backoff_ms: u64,
    /// Route backend calls through `HTTP_PROXY`/`HTTPS_PROXY` when set
    pub use_env_proxy: bool,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://host.minikube.internal:39443/v1/chat/completions".to_string(),
            timeout_secs: 60,
            max_retries: 0,
            retry_backoff_ms: 250,
            use_env_proxy: true,
        }
    }
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Directory holding `<identity>.yml` user policy documents
    pub directory: PathBuf,
    /// Identity used when the request carries no identity header
    pub default_identity: String,
    /// Request header carrying the caller identity
    pub identity_header: String,
    /// Content rules applied to every request
    pub tenant: TenantPolicy,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/app/policies"),
            default_identity: "default_user".to_string(),
            identity_header: "authorization".to_string(),
            tenant: TenantPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Directory exposed by `list_directory` and `file_content`
    pub data_dir: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/app/test_data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationSettings {
    /// Maximum number of tool-execution rounds per request
    pub max_tool_rounds: u32,
    /// Wall-clock budget for the whole request, across all rounds
    pub request_timeout_secs: u64,
    /// Instructions merged into the conversation's system message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            request_timeout_secs: 300,
            system_prompt: None,
        }
    }
}

impl OrchestrationSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ProxyConfig {
    /// Default config file location (`<config dir>/toolproxy/config.yaml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("toolproxy").join("config.yaml"))
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load the effective configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present. Environment overrides are applied last and the
    /// result is validated.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(default) => Self::from_file(default)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the proxy cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.url must not be empty".to_string()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid("backend.timeout_secs must be positive".to_string()));
        }
        if self.orchestration.max_tool_rounds == 0 {
            return Err(ConfigError::Invalid(
                "orchestration.max_tool_rounds must be at least 1".to_string(),
            ));
        }
        if self.orchestration.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "orchestration.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.policy.identity_header.trim().is_empty() {
            return Err(ConfigError::Invalid("policy.identity_header must not be empty".to_string()));
        }
        Ok(())
    }
}
