//! Core domain types and logic.

pub mod backtest;
pub mod cycle;
pub mod error;
pub mod execution;
pub mod exposure;
pub mod indicators;
pub mod ohlcv;
pub mod order;
pub mod portfolio;
pub mod rebalancer;
pub mod regime;
pub mod settings;
pub mod snapshot;
