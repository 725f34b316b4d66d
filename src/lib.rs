// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use api::{BinanceClient, ExchangeClient};
pub use config::{ConfigOverrides, Credentials, LoopConfig};
pub use error::{ConfigError, CycleError, ExchangeError};
pub use execution::{CycleOutcome, TradingLoop};
pub use models::*;
pub use strategy::{MaCrossoverStrategy, Strategy};
