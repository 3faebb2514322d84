//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_set;
pub mod strategy;
pub mod signal;
pub mod position;
pub mod backtest;
pub mod metrics;
pub mod features;
pub mod alerts;
pub mod universe;
pub mod config_validation;
pub mod pipeline;
pub mod error;
