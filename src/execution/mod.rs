// Order sizing, decision making and the polling loop
pub mod executor;
pub mod quantity;
pub mod trading_loop;

pub use executor::{ExecutionAction, ExecutionDecision, Executor, SkipReason};
pub use quantity::{adjust_to_rules, normalize_quantity};
pub use trading_loop::{CycleOutcome, TradingLoop};
