//! Policy enforcement
//!
//! Two independent layers guard every proxied request:
//! - Tenant policy: content rules over the whole conversation, checked
//!   before the backend is contacted.
//! - User policy: per-identity tool authorization, checked for every tool
//!   call the backend requests. Documents are re-read on every check and
//!   anything not explicitly allowed is denied.

mod decision;
mod tenant;
mod user;
mod store;
mod file_store;
mod memory_store;

pub use decision::PolicyDecision;
pub use tenant::{BannedKeyword, TenantPolicy};
pub use user::{ToolPermission, UserPolicy, UserPolicyEngine};
pub use store::{PolicyError, PolicyResult, PolicyStore};
pub use file_store::FilePolicyStore;
pub use memory_store::MemoryPolicyStore;
