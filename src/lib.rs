//! Priority task queue and agent-to-agent handoff store.
//!
//! [`queue::TaskStore`] holds per-agent work items, [`queue::TaskGenerator`]
//! turns analysis findings into tasks, and [`link::AgentLink`] records
//! delegations, reports and capability requests. Every state change is
//! announced through [`notify::Notifier`].

pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod hub;
pub mod link;
pub mod models;
pub mod notify;
pub mod queue;
pub mod utils;

pub use errors::TaskhubError;
pub use hub::Hub;
