//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_journal;
pub mod paper_broker;
pub mod replay_data;
pub mod telegram_notifier;
