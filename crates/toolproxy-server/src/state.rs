//! Shared handler state

use std::sync::Arc;

use axum::http::HeaderMap;

use toolproxy_core::config::PolicySettings;
use toolproxy_core::{
    builtin_tools, FilePolicyStore, HttpBackend, LoopLimits, Orchestrator, ProxyConfig, SharedLogger,
    ToolRegistry, TracingLogger, UserPolicyEngine,
};

use crate::error::ServerResult;

/// State cloned into every request handler
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    identity_header: String,
    default_identity: String,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, policy: &PolicySettings) -> Self {
        Self {
            orchestrator,
            identity_header: policy.identity_header.to_ascii_lowercase(),
            default_identity: policy.default_identity.clone(),
        }
    }

    /// Wire the production components described by `config`
    pub fn from_config(config: &ProxyConfig) -> ServerResult<Self> {
        let logger: SharedLogger = Arc::new(TracingLogger::for_component("orchestrator"));

        let backend = HttpBackend::from_settings(
            &config.backend,
            Arc::new(TracingLogger::for_component("backend")),
        )?;
        let registry = ToolRegistry::from_declarations(builtin_tools(&config.tools.data_dir))?;
        let users = UserPolicyEngine::new(
            Arc::new(FilePolicyStore::new(&config.policy.directory)),
            Arc::new(TracingLogger::for_component("policy")),
        );

        let orchestrator = Orchestrator::new(
            Arc::new(backend),
            Arc::new(registry),
            config.policy.tenant.clone(),
            users,
            logger,
        )
        .with_limits(LoopLimits::from(&config.orchestration))
        .with_system_prompt(config.orchestration.system_prompt.clone());

        tracing::info!(
            backend = %config.backend.url,
            policies = %config.policy.directory.display(),
            tools = ?orchestrator.registry().names().collect::<Vec<_>>(),
            "proxy components ready"
        );

        Ok(Self::new(Arc::new(orchestrator), &config.policy))
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Caller identity from the configured header, or the default identity
    pub fn identity(&self, headers: &HeaderMap) -> String {
        headers
            .get(self.identity_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_identity.clone())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("orchestrator", &self.orchestrator)
            .field("identity_header", &self.identity_header)
            .finish()
    }
}
