//! Business logic services.
//!
//! The assignment engine and its building blocks, the directory and stats
//! read paths, and the HTTP surface that exposes them.

pub mod api;
pub mod assignment;
pub mod directory;
pub mod eligibility;
pub mod guard;
pub mod rotation;
pub mod selector;
pub mod server;
pub mod stats;
pub mod store;

pub use api::{router, AppState};
pub use assignment::{AssignmentEngine, BulkDeactivationReport, Reassignment};
pub use selector::ReviewerSelector;
pub use server::{start_server, ServerHandle};
pub use store::EntityStore;
