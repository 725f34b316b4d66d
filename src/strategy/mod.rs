// Trading strategy module
pub mod crossover;
pub mod signals;

pub use crossover::{CrossoverConfig, MaCrossoverStrategy};
pub use signals::SignalState;

use crate::models::Candle;

/// Base trait for signal-producing strategies
pub trait Strategy: Send + Sync {
    /// Signal state of the latest candle, `None` while there is not enough history
    fn evaluate(&self, candles: &[Candle]) -> Option<SignalState>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum candles required for this strategy
    fn min_candles_required(&self) -> usize;
}
