//! Logging abstractions
//!
//! Components take an `Arc<dyn Logger>` so tests can run silently while the
//! server routes everything through `tracing`.

mod traits;
mod noop;
mod tracing_logger;

pub use traits::{Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use tracing_logger::TracingLogger;
