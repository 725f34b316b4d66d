use super::{
    signals::{classify, SignalState},
    Strategy,
};
use crate::indicators::{calculate_sma, calculate_sma_series};
use crate::models::{Candle, Signal};

/// Window lengths for the crossover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossoverConfig {
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            short_period: 50,
            long_period: 200,
        }
    }
}

/// Golden/death cross strategy on simple moving averages of the close
///
/// A candle is bullish when the short SMA is strictly above the long SMA and
/// bearish otherwise. Before the long window is filled the signal is neutral.
#[derive(Debug, Clone, Default)]
pub struct MaCrossoverStrategy {
    config: CrossoverConfig,
}

impl MaCrossoverStrategy {
    pub fn new(config: CrossoverConfig) -> Self {
        Self { config }
    }

    /// Signal state for every candle from the end of the warm-up window on
    pub fn compute_states(&self, candles: &[Candle]) -> Vec<SignalState> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let short = calculate_sma_series(&closes, self.config.short_period);
        let long = calculate_sma_series(&closes, self.config.long_period);

        let signal_at = |i: usize| match (short[i], long[i]) {
            (Some(s), Some(l)) => classify(s, l),
            _ => Signal::Neutral,
        };

        let first = self.config.long_period.saturating_sub(1);
        (first..candles.len())
            .filter_map(|i| {
                let (short_average, long_average) = (short[i]?, long[i]?);
                Some(SignalState {
                    index: i,
                    open_time: candles[i].open_time,
                    close: candles[i].close,
                    short_average,
                    long_average,
                    signal: classify(short_average, long_average),
                    position_signal: i.checked_sub(1).map_or(Signal::Neutral, &signal_at),
                })
            })
            .collect()
    }

    fn signal_at(&self, closes: &[f64], index: usize) -> Signal {
        let window = &closes[..=index];
        match (
            calculate_sma(window, self.config.short_period),
            calculate_sma(window, self.config.long_period),
        ) {
            (Some(short), Some(long)) => classify(short, long),
            _ => Signal::Neutral,
        }
    }

    fn state_at(&self, candles: &[Candle], closes: &[f64], index: usize) -> Option<SignalState> {
        let window = &closes[..=index];
        let short_average = calculate_sma(window, self.config.short_period)?;
        let long_average = calculate_sma(window, self.config.long_period)?;

        let position_signal = match index.checked_sub(1) {
            Some(previous) => self.signal_at(closes, previous),
            None => Signal::Neutral,
        };

        Some(SignalState {
            index,
            open_time: candles[index].open_time,
            close: candles[index].close,
            short_average,
            long_average,
            signal: classify(short_average, long_average),
            position_signal,
        })
    }
}

impl Strategy for MaCrossoverStrategy {
    fn evaluate(&self, candles: &[Candle]) -> Option<SignalState> {
        if candles.len() < self.min_candles_required() {
            return None;
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        self.state_at(candles, &closes, candles.len() - 1)
    }

    fn name(&self) -> &str {
        "MaCrossoverStrategy"
    }

    fn min_candles_required(&self) -> usize {
        self.config.long_period.max(self.config.short_period).max(1)
    }
}
