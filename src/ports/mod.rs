//! Port traits the domain depends on. Adapters implement them.

pub mod broker_port;
pub mod config_port;
pub mod data_port;
pub mod journal_port;
pub mod notifier_port;
pub mod replay_port;
