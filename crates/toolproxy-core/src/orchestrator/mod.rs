//! Tool-call orchestration loop
//!
//! One `Orchestrator::run` call handles one inbound request:
//!
//! ```text
//!            tenant policy ──deny──▶ BLOCKED
//!                 │
//!                 ▼
//!   ┌───────▶ FORWARDING ──transport error──▶ FAILED
//!   │             │
//!   │             ▼
//!   │         MATCHING ──no registered calls──▶ DONE
//!   │             │      ──round cap reached──▶ FAILED
//!   │             ▼
//!   │        AUTHORIZING ──user policy deny──▶ BLOCKED
//!   │             │
//!   │             ▼
//!   └──────── EXECUTING ──tool error──▶ FAILED
//! ```
//!
//! Every FORWARDING step sends the whole accumulated conversation. The loop
//! is bounded by a round cap and a wall-clock budget, and stops early when
//! the caller's cancellation token fires.

mod error;
mod controller;

pub use error::{ProxyError, ProxyResult};
pub use controller::{LoopLimits, LoopState, Orchestrator, ProxyResponse};
