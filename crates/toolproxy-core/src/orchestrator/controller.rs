//! Orchestration loop controller

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::error::{ProxyError, ProxyResult};
use crate::backend::{Backend, BackendError};
use crate::config::OrchestrationSettings;
use crate::conversation::ConversationState;
use crate::logging::Logger;
use crate::policy::{TenantPolicy, UserPolicyEngine};
use crate::tools::{match_tool_calls, ToolExecutor, ToolMatch, ToolRegistry};
use crate::types::{CancellationToken, ChatCompletionRequest, ChatMessage, ToolCall};

/// Bounds on a single request's tool loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    /// Maximum tool-execution rounds before failing
    pub max_tool_rounds: u32,
    /// Wall-clock budget across all rounds
    pub request_timeout: Duration,
}

impl Default for LoopLimits {
    fn default() -> Self {
        (&OrchestrationSettings::default()).into()
    }
}

impl From<&OrchestrationSettings> for LoopLimits {
    fn from(settings: &OrchestrationSettings) -> Self {
        Self {
            max_tool_rounds: settings.max_tool_rounds,
            request_timeout: settings.request_timeout(),
        }
    }
}

/// Loop states, used for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Forwarding,
    Matching,
    Authorizing,
    Executing,
    Done,
    Blocked,
    Failed,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopState::Forwarding => "FORWARDING",
            LoopState::Matching => "MATCHING",
            LoopState::Authorizing => "AUTHORIZING",
            LoopState::Executing => "EXECUTING",
            LoopState::Done => "DONE",
            LoopState::Blocked => "BLOCKED",
            LoopState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// The final backend reply, relayed verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Bytes,
    /// Tool rounds executed before the final reply
    pub rounds: u32,
}

/// Drives one request from tenant check to final backend answer
///
/// All collaborators are injected; the orchestrator holds no per-request
/// state and can be shared across concurrent requests.
pub struct Orchestrator {
    backend: Arc<dyn Backend>,
    executor: ToolExecutor,
    tenant: TenantPolicy,
    users: UserPolicyEngine,
    limits: LoopLimits,
    system_prompt: Option<String>,
    logger: Arc<dyn Logger>,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn Backend>,
        registry: Arc<ToolRegistry>,
        tenant: TenantPolicy,
        users: UserPolicyEngine,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            backend,
            executor: ToolExecutor::new(registry, Arc::clone(&logger)),
            tenant,
            users,
            limits: LoopLimits::default(),
            system_prompt: None,
            logger,
        }
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    /// System instructions merged into every conversation before forwarding
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn limits(&self) -> LoopLimits {
        self.limits
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    /// Handle one proxied chat-completion request for `identity`
    #[tracing::instrument(name = "proxy_request", skip_all, fields(identity = %identity))]
    pub async fn run(
        &self,
        request: ChatCompletionRequest,
        identity: &str,
        cancel: &CancellationToken,
    ) -> ProxyResult<ProxyResponse> {
        let decision = self.tenant.check(&request.messages);
        if !decision.allowed {
            let reason = decision.reason_or_default().to_string();
            self.logger.warn(&format!(
                "[Orchestrator] {}: tenant policy denied request from '{}': {}",
                LoopState::Blocked,
                identity,
                reason
            ));
            return Err(ProxyError::TenantPolicyViolation { reason });
        }

        let budget = self.limits.request_timeout;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProxyError::Cancelled),
            outcome = tokio::time::timeout(budget, self.run_loop(request, identity)) => {
                outcome.unwrap_or(Err(ProxyError::DeadlineExceeded(budget)))
            }
        };

        match &result {
            Ok(response) => self.logger.info(&format!(
                "[Orchestrator] {}: status {} after {} tool round(s)",
                LoopState::Done,
                response.status,
                response.rounds
            )),
            Err(ProxyError::UserPolicyViolation { .. }) => {}
            Err(e) => self.logger.error(&format!("[Orchestrator] {}: {}", LoopState::Failed, e)),
        }
        result
    }

    async fn run_loop(&self, request: ChatCompletionRequest, identity: &str) -> ProxyResult<ProxyResponse> {
        let mut state = ConversationState::from_request(request, self.registry().llm_tools());
        if let Some(prompt) = &self.system_prompt {
            state.add_system_message(prompt);
        }

        let mut rounds = 0u32;
        loop {
            self.logger.debug(&format!(
                "[Orchestrator] {}: round {} with {} messages",
                LoopState::Forwarding,
                rounds,
                state.messages().len()
            ));
            let reply = self.backend.chat_completion(state.request()).await?;

            let completion = reply.completion().map_err(|e| match e {
                BackendError::InvalidResponse(message) => ProxyError::InvalidBackendResponse(message),
                other => ProxyError::Backend(other),
            })?;

            let (assistant, calls) = match match_tool_calls(&completion, self.registry()) {
                ToolMatch::NoToolCalls => {
                    return Ok(ProxyResponse {
                        status: reply.status,
                        body: reply.body,
                        rounds,
                    });
                }
                ToolMatch::OnlyUnregistered { names } => {
                    self.logger.warn(&format!(
                        "[Orchestrator] {}: backend requested only unregistered tools {:?}; returning reply as final",
                        LoopState::Matching,
                        names
                    ));
                    return Ok(ProxyResponse {
                        status: reply.status,
                        body: reply.body,
                        rounds,
                    });
                }
                ToolMatch::Matched {
                    assistant_message,
                    calls,
                    unregistered,
                } => {
                    if !unregistered.is_empty() {
                        self.logger.warn(&format!(
                            "[Orchestrator] {}: skipping unregistered tools {:?}",
                            LoopState::Matching,
                            unregistered
                        ));
                    }
                    (assistant_message, calls)
                }
            };

            if rounds >= self.limits.max_tool_rounds {
                return Err(ProxyError::LoopBoundExceeded {
                    max_rounds: self.limits.max_tool_rounds,
                });
            }

            self.authorize(identity, &calls).await?;
            self.execute(&mut state, &assistant, &calls).await?;
            rounds += 1;
        }
    }

    /// Check every call of the batch before any of it runs
    async fn authorize(&self, identity: &str, calls: &[ToolCall]) -> ProxyResult<()> {
        let mut checked = HashSet::new();
        for call in calls {
            if !checked.insert(call.name()) {
                continue;
            }
            self.logger.debug(&format!(
                "[Orchestrator] {}: tool '{}' for '{}'",
                LoopState::Authorizing,
                call.name(),
                identity
            ));
            let decision = self.users.check(identity, call.name()).await;
            if !decision.allowed {
                let reason = decision.reason_or_default().to_string();
                self.logger.warn(&format!(
                    "[Orchestrator] {}: user policy denied tool '{}' for '{}': {}",
                    LoopState::Blocked,
                    call.name(),
                    identity,
                    reason
                ));
                return Err(ProxyError::UserPolicyViolation {
                    identity: identity.to_string(),
                    tool: call.name().to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Run the batch in backend order, appending each result as it lands
    async fn execute(
        &self,
        state: &mut ConversationState,
        assistant: &ChatMessage,
        calls: &[ToolCall],
    ) -> ProxyResult<()> {
        for call in calls {
            self.logger.debug(&format!(
                "[Orchestrator] {}: {}",
                LoopState::Executing,
                call.name()
            ));
            let result = self
                .executor
                .execute(call)
                .await
                .map_err(|source| ProxyError::ToolExecution {
                    tool: call.name().to_string(),
                    source,
                })?;
            state.append_tool_exchange(assistant, call, result);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.backend.name())
            .field("registry", self.registry())
            .field("limits", &self.limits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{completion_with_content, completion_with_tool_calls, MockBackend, MockReply};
    use crate::logging::NoOpLogger;
    use crate::policy::{MemoryPolicyStore, UserPolicy};
    use crate::tools::{from_fn, ToolDeclaration, ToolError};
    use crate::types::{MessageRole, ToolDefinition};
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    /// Registry with `time_now`, `file_content` and a failing `broken` tool;
    /// every execution is recorded by name.
    fn registry(executed: Arc<Mutex<Vec<String>>>) -> Arc<ToolRegistry> {
        let log = Arc::clone(&executed);
        let time_now = ToolDeclaration::new(
            ToolDefinition::new("time_now", "Returns current time in ISO format"),
            from_fn(move |_| {
                log.lock().push("time_now".to_string());
                Ok(json!("2024-05-01T12:00:00+00:00"))
            }),
        );
        let log = Arc::clone(&executed);
        let file_content = ToolDeclaration::new(
            ToolDefinition::new("file_content", "Returns the content"),
            from_fn(move |args| {
                log.lock().push("file_content".to_string());
                Ok(json!(format!("content of {}", args.unwrap_or(Value::Null)["file_name"])))
            }),
        );
        let broken = ToolDeclaration::new(
            ToolDefinition::new("broken", "Always fails"),
            from_fn(|_| Err(ToolError::Failed("disk on fire".to_string()))),
        );
        Arc::new(ToolRegistry::from_declarations([time_now, file_content, broken]).unwrap())
    }

    struct Harness {
        backend: Arc<MockBackend>,
        executed: Arc<Mutex<Vec<String>>>,
        orchestrator: Orchestrator,
    }

    fn harness(backend: MockBackend, policies: MemoryPolicyStore) -> Harness {
        let backend = Arc::new(backend);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let orchestrator = Orchestrator::new(
            Arc::clone(&backend) as Arc<dyn Backend>,
            registry(Arc::clone(&executed)),
            TenantPolicy::default(),
            UserPolicyEngine::new(Arc::new(policies), Arc::clone(&logger)),
            logger,
        );
        Harness {
            backend,
            executed,
            orchestrator,
        }
    }

    fn allow_all() -> MemoryPolicyStore {
        let store = MemoryPolicyStore::new();
        store.insert(
            "default_user",
            UserPolicy::default()
                .with_tool("time_now", true)
                .with_tool("file_content", true)
                .with_tool("broken", true),
        );
        store
    }

    fn hi() -> ChatCompletionRequest {
        ChatCompletionRequest::new(vec![ChatMessage::user("hi")]).with_model("test-model")
    }

    async fn run(h: &Harness, request: ChatCompletionRequest) -> ProxyResult<ProxyResponse> {
        h.orchestrator
            .run(request, "default_user", &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_final_answer_relayed_verbatim() {
        let answer = completion_with_content("Hello!");
        let h = harness(MockBackend::new().reply(answer.clone()), allow_all());

        let response = run(&h, hi()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.rounds, 0);
        assert_eq!(serde_json::from_slice::<Value>(&response.body).unwrap(), answer);
        assert_eq!(h.backend.call_count(), 1);

        // The registry's tools were attached to the forwarded request
        let sent = &h.backend.requests()[0];
        let names: Vec<&str> = sent.tools.iter().map(|t| t.function.name.as_str()).collect();
        assert_eq!(names, vec!["time_now", "file_content", "broken"]);
        assert_eq!(sent.model.as_deref(), Some("test-model"));
    }

    #[tokio::test]
    async fn test_tool_round_then_final_answer() {
        let backend = MockBackend::new()
            .reply(completion_with_tool_calls(&[("time_now", "{}")]))
            .reply(completion_with_content("It is noon."));
        let h = harness(backend, allow_all());

        let response = run(&h, hi()).await.unwrap();
        assert_eq!(response.rounds, 1);
        assert_eq!(
            serde_json::from_slice::<Value>(&response.body).unwrap(),
            completion_with_content("It is noon.")
        );
        assert_eq!(*h.executed.lock(), vec!["time_now"]);

        let requests = h.backend.requests();
        assert_eq!(requests.len(), 2);
        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, MessageRole::Assistant);
        assert_eq!(second[1].calls()[0].name(), "time_now");
        assert_eq!(second[2].role, MessageRole::Tool);
        assert_eq!(second[2].name.as_deref(), Some("time_now"));
        assert_eq!(second[2].text(), Some("2024-05-01T12:00:00+00:00"));
        assert_eq!(second[2].tool_call_id.as_deref(), Some("call_0"));
    }

    #[tokio::test]
    async fn test_results_follow_backend_order() {
        let backend = MockBackend::new()
            .reply(completion_with_tool_calls(&[
                ("file_content", r#"{"file_name":"a.txt"}"#),
                ("time_now", "{}"),
            ]))
            .reply(completion_with_content("done"));
        let h = harness(backend, allow_all());

        run(&h, hi()).await.unwrap();

        assert_eq!(*h.executed.lock(), vec!["file_content", "time_now"]);
        let messages = &h.backend.requests()[1].messages;
        let tool_names: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .filter_map(|m| m.name.as_deref())
            .collect();
        assert_eq!(tool_names, vec!["file_content", "time_now"]);
        assert_eq!(messages[2].text(), Some("content of \"a.txt\""));
    }

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn debug(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }
        fn info(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }
        fn warn(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }
        fn error(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn test_every_state_is_logged() {
        let backend = Arc::new(
            MockBackend::new()
                .reply(completion_with_tool_calls(&[("time_now", "{}")]))
                .reply(completion_with_content("ok")),
        );
        let logger = Arc::new(RecordingLogger::default());
        let orchestrator = Orchestrator::new(
            backend,
            registry(Arc::new(Mutex::new(Vec::new()))),
            TenantPolicy::default(),
            UserPolicyEngine::new(Arc::new(allow_all()), Arc::new(NoOpLogger::new())),
            Arc::clone(&logger) as Arc<dyn Logger>,
        );

        orchestrator
            .run(hi(), "default_user", &CancellationToken::new())
            .await
            .unwrap();

        let lines = logger.lines.lock();
        for state in ["FORWARDING", "AUTHORIZING", "EXECUTING", "DONE"] {
            assert!(
                lines.iter().any(|line| line.contains(state)),
                "no {} line in {:?}",
                state,
                *lines
            );
        }
        assert!(lines.iter().any(|line| line.contains("AUTHORIZING: tool 'time_now' for 'default_user'")));
    }

    #[tokio::test]
    async fn test_final_answer_without_role_is_relayed() {
        let answer = json!({ "choices": [{ "message": { "content": "hi" } }] });
        let h = harness(MockBackend::new().reply(answer.clone()), allow_all());

        let response = run(&h, hi()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(serde_json::from_slice::<Value>(&response.body).unwrap(), answer);
    }

    #[tokio::test]
    async fn test_final_answer_with_content_parts_is_relayed() {
        let answer = json!({
            "choices": [{
                "message": { "role": "assistant", "content": [{ "type": "text", "text": "hi" }] },
                "finish_reason": "stop"
            }]
        });
        let h = harness(MockBackend::new().reply(answer.clone()), allow_all());

        let response = run(&h, hi()).await.unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&response.body).unwrap(), answer);
        assert_eq!(h.backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_only_unregistered_returns_reply_unexecuted() {
        let reply = completion_with_tool_calls(&[("multiply", r#"{"a":2,"b":3}"#)]);
        let h = harness(MockBackend::new().reply(reply.clone()), allow_all());

        let response = run(&h, hi()).await.unwrap();

        assert_eq!(serde_json::from_slice::<Value>(&response.body).unwrap(), reply);
        assert_eq!(h.backend.call_count(), 1);
        assert!(h.executed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_tenant_violation_never_contacts_backend() {
        let h = harness(MockBackend::new().reply(completion_with_content("x")), allow_all());
        let request = ChatCompletionRequest::new(vec![ChatMessage::user("my password is hunter2")]);

        let err = run(&h, request).await.unwrap_err();

        assert!(matches!(err, ProxyError::TenantPolicyViolation { .. }));
        assert_eq!(err.status_code(), 403);
        assert_eq!(h.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_deny_blocks_whole_batch() {
        let store = MemoryPolicyStore::new();
        store.insert(
            "default_user",
            UserPolicy::default()
                .with_tool("time_now", true)
                .with_tool("file_content", false),
        );
        let backend = MockBackend::new()
            .reply(completion_with_tool_calls(&[
                ("time_now", "{}"),
                ("file_content", r#"{"file_name":"a.txt"}"#),
            ]))
            .reply(completion_with_content("unreachable"));
        let h = harness(backend, store);

        let err = run(&h, hi()).await.unwrap_err();

        match err {
            ProxyError::UserPolicyViolation { tool, identity, .. } => {
                assert_eq!(tool, "file_content");
                assert_eq!(identity, "default_user");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(h.executed.lock().is_empty());
        assert_eq!(h.backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_policy_entry_denies() {
        let store = MemoryPolicyStore::new();
        store.insert("default_user", UserPolicy::default().with_tool("time_now", true));
        let backend = MockBackend::new()
            .reply(completion_with_tool_calls(&[("file_content", r#"{"file_name":"a.txt"}"#)]));
        let h = harness(backend, store);

        let err = run(&h, hi()).await.unwrap_err();
        assert_eq!(err.code(), "user_policy_violation");
        assert!(h.executed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_loop_bound_exceeded() {
        let backend = MockBackend::new().repeat(completion_with_tool_calls(&[("time_now", "{}")]));
        let mut h = harness(backend, allow_all());
        h.orchestrator = h.orchestrator.with_limits(LoopLimits {
            max_tool_rounds: 3,
            request_timeout: Duration::from_secs(10),
        });

        let err = run(&h, hi()).await.unwrap_err();

        assert!(matches!(err, ProxyError::LoopBoundExceeded { max_rounds: 3 }));
        assert_eq!(h.executed.lock().len(), 3);
        assert_eq!(h.backend.call_count(), 4);
    }

    #[tokio::test]
    async fn test_tool_failure_is_surfaced() {
        let backend = MockBackend::new()
            .reply(completion_with_tool_calls(&[("broken", "{}")]))
            .reply(completion_with_content("unreachable"));
        let h = harness(backend, allow_all());

        let err = run(&h, hi()).await.unwrap_err();

        assert!(matches!(err, ProxyError::ToolExecution { ref tool, .. } if tool == "broken"));
        assert_eq!(err.status_code(), 500);
        assert_eq!(h.backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_arguments_fail_request() {
        let backend = MockBackend::new()
            .reply(completion_with_tool_calls(&[("file_content", "{oops")]));
        let h = harness(backend, allow_all());

        let err = run(&h, hi()).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::ToolExecution { source: ToolError::InvalidArguments(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_backend_failures() {
        let h = harness(
            MockBackend::new().then(MockReply::Status(503, json!({"error": "overloaded"}))),
            allow_all(),
        );
        let err = run(&h, hi()).await.unwrap_err();
        assert!(matches!(err, ProxyError::Backend(_)));

        let h = harness(MockBackend::new().then(MockReply::Raw("<html>".into())), allow_all());
        let err = run(&h, hi()).await.unwrap_err();
        assert!(matches!(err, ProxyError::InvalidBackendResponse(_)));
        let message = err.to_string();
        assert!(message.starts_with("invalid backend response: body is not a chat completion"));
        assert_eq!(message.matches("invalid").count(), 1);

        let malformed_calls = json!({ "choices": [{ "message": { "tool_calls": "time_now" } }] });
        let h = harness(MockBackend::new().reply(malformed_calls), allow_all());
        let err = run(&h, hi()).await.unwrap_err();
        assert!(matches!(err, ProxyError::InvalidBackendResponse(_)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let backend = MockBackend::new()
            .with_delay(Duration::from_millis(200))
            .repeat(completion_with_tool_calls(&[("time_now", "{}")]));
        let mut h = harness(backend, allow_all());
        h.orchestrator = h.orchestrator.with_limits(LoopLimits {
            max_tool_rounds: 100,
            request_timeout: Duration::from_millis(500),
        });

        let err = run(&h, hi()).await.unwrap_err();
        assert!(matches!(err, ProxyError::DeadlineExceeded(_)));
    }

    #[tokio::test]
    async fn test_cancellation_stops_loop() {
        let backend = MockBackend::new()
            .with_delay(Duration::from_secs(30))
            .reply(completion_with_content("late"));
        let h = harness(backend, allow_all());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = h.orchestrator.run(hi(), "default_user", &cancel).await.unwrap_err();
        assert!(matches!(err, ProxyError::Cancelled));
    }

    #[tokio::test]
    async fn test_system_prompt_merged_once() {
        let backend = MockBackend::new()
            .reply(completion_with_tool_calls(&[("time_now", "{}")]))
            .reply(completion_with_content("ok"));
        let mut h = harness(backend, allow_all());
        h.orchestrator = h
            .orchestrator
            .with_system_prompt(Some("Use tools when needed.".to_string()));

        let request = ChatCompletionRequest::new(vec![
            ChatMessage::system("You are helpful."),
            ChatMessage::user("hi"),
        ]);
        run(&h, request).await.unwrap();

        for sent in h.backend.requests() {
            let systems: Vec<&ChatMessage> = sent
                .messages
                .iter()
                .filter(|m| m.role == MessageRole::System)
                .collect();
            assert_eq!(systems.len(), 1);
            assert_eq!(systems[0].text(), Some("You are helpful. \nUse tools when needed."));
        }
    }
}
