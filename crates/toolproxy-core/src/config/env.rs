//! Environment variable overrides

use std::path::PathBuf;
use std::str::FromStr;

use super::file::ProxyConfig;
use super::{ConfigError, ConfigResult};

pub const ENV_BACKEND_URL: &str = "LLAMA_BACKEND";
pub const ENV_POLICY_DIR: &str = "TOOLPROXY_POLICY_DIR";
pub const ENV_DATA_DIR: &str = "TOOLPROXY_DATA_DIR";
pub const ENV_BIND: &str = "TOOLPROXY_BIND";
pub const ENV_MAX_TOOL_ROUNDS: &str = "TOOLPROXY_MAX_TOOL_ROUNDS";
pub const ENV_REQUEST_TIMEOUT: &str = "TOOLPROXY_REQUEST_TIMEOUT_SECS";
pub const ENV_SYSTEM_PROMPT: &str = "TOOLPROXY_SYSTEM_PROMPT";

impl ProxyConfig {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(dir) = get(ENV_POLICY_DIR) {
            self.policy.directory = PathBuf::from(dir);
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.tools.data_dir = PathBuf::from(dir);
        }
        if let Some(bind) = get(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(value) = get(ENV_MAX_TOOL_ROUNDS) {
            self.orchestration.max_tool_rounds = parse(ENV_MAX_TOOL_ROUNDS, &value)?;
        }
        if let Some(value) = get(ENV_REQUEST_TIMEOUT) {
            self.orchestration.request_timeout_secs = parse(ENV_REQUEST_TIMEOUT, &value)?;
        }
        if let Some(prompt) = get(ENV_SYSTEM_PROMPT) {
            self.orchestration.system_prompt = Some(prompt);
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
