//! In-process proxy under test

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use toolproxy_core::ProxyConfig;
use toolproxy_server::{router, AppState};

/// A running proxy with its own policy and data directories
pub struct ProxyHandle {
    base_url: String,
    client: reqwest::Client,
    policies: TempDir,
    data: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl ProxyHandle {
    /// Start a proxy forwarding to `backend_url`; `configure` may adjust
    /// the rest of the configuration before startup
    pub async fn spawn(backend_url: &str, configure: impl FnOnce(&mut ProxyConfig)) -> Self {
        let policies = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();

        let mut config = ProxyConfig::default();
        config.backend.url = backend_url.to_string();
        config.backend.timeout_secs = 5;
        config.backend.use_env_proxy = false;
        config.policy.directory = policies.path().to_path_buf();
        config.tools.data_dir = data.path().to_path_buf();
        configure(&mut config);

        let app = router(AppState::from_config(&config).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            policies,
            data,
            shutdown: Some(shutdown_tx),
            join: Some(join),
        }
    }

    /// Write `<identity>.yml` into the policy directory
    pub fn write_policy(&self, identity: &str, yaml: &str) {
        fs::write(self.policies.path().join(format!("{}.yml", identity)), yaml).unwrap();
    }

    /// Write a file into the tool data directory
    pub fn write_data(&self, name: &str, content: &str) {
        fs::write(self.data.path().join(name), content).unwrap();
    }

    pub fn data_dir(&self) -> &Path {
        self.data.path()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a chat-completion body, optionally as `identity`
    pub async fn chat(&self, body: &serde_json::Value, identity: Option<&str>) -> reqwest::Response {
        let mut request = self.client.post(self.url("/v1/chat/completions")).json(body);
        if let Some(identity) = identity {
            request = request.header("authorization", identity);
        }
        request.send().await.unwrap()
    }
}

impl Drop for ProxyHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}
