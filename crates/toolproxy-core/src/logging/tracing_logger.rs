//! Logger backed by the `tracing` crate

use super::traits::Logger;

/// Forwards log calls to `tracing` events
///
/// Events are emitted under the `toolproxy` target with a `component` field,
/// so a subscriber filter like `RUST_LOG=toolproxy=debug` selects them.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: String,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::for_component("proxy")
    }

    /// Create a logger that tags events with a component name
    pub fn for_component(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "toolproxy", component = %self.component, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "toolproxy", component = %self.component, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "toolproxy", component = %self.component, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "toolproxy", component = %self.component, "{}", message);
    }
}
