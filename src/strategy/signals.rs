use chrono::{DateTime, Utc};

use crate::models::{Candle, KlineInterval, Signal, TradeSide};

/// Moving-average state attached to one candle
#[derive(Debug, Clone, PartialEq)]
pub struct SignalState {
    pub index: usize,
    pub open_time: DateTime<Utc>,
    pub close: f64,
    pub short_average: f64,
    pub long_average: f64,
    pub signal: Signal,
    /// Signal of the previous candle, `Neutral` if it was still warming up
    pub position_signal: Signal,
}

impl SignalState {
    /// Trade confirmed by two consecutive candles agreeing on direction
    pub fn trigger(&self) -> Option<TradeSide> {
        trade_trigger(self.position_signal, self.signal)
    }
}

/// Map (previous, current) signal pairs to a trade side
pub fn trade_trigger(previous: Signal, current: Signal) -> Option<TradeSide> {
    match (previous, current) {
        (Signal::Bullish, Signal::Bullish) => Some(TradeSide::Buy),
        (Signal::Bearish, Signal::Bearish) => Some(TradeSide::Sell),
        _ => None,
    }
}

/// Classify a pair of averages. Ties count as bearish.
pub fn classify(short_average: f64, long_average: f64) -> Signal {
    if short_average > long_average {
        Signal::Bullish
    } else {
        Signal::Bearish
    }
}

/// Validate that a candle series is strictly ascending in time
///
/// Gaps wider than 1.5x the interval are only logged: the exchange has
/// maintenance windows and the averages stay meaningful across them.
pub fn validate_candle_series(
    candles: &[Candle],
    interval: KlineInterval,
) -> anyhow::Result<()> {
    let max_gap = interval.duration() + interval.duration() / 2;

    for window in candles.windows(2) {
        let time_diff = window[1].open_time - window[0].open_time;

        if time_diff <= chrono::Duration::zero() {
            anyhow::bail!(
                "Candles are not strictly ascending: {} followed by {}",
                window[0].open_time.format("%Y-%m-%d %H:%M:%S"),
                window[1].open_time.format("%Y-%m-%d %H:%M:%S")
            );
        }

        if time_diff > max_gap {
            tracing::debug!(
                "Gap of {}s between candles at {} and {}",
                time_diff.num_seconds(),
                window[0].open_time.format("%Y-%m-%d %H:%M"),
                window[1].open_time.format("%Y-%m-%d %H:%M")
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn candles_at(offsets_hours: &[i64]) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        offsets_hours
            .iter()
            .map(|&h| Candle {
                open_time: base + Duration::hours(h),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_trigger_requires_confirmation() {
        assert_eq!(trade_trigger(Signal::Bullish, Signal::Bullish), Some(TradeSide::Buy));
        assert_eq!(trade_trigger(Signal::Bearish, Signal::Bearish), Some(TradeSide::Sell));
        assert_eq!(trade_trigger(Signal::Bearish, Signal::Bullish), None);
        assert_eq!(trade_trigger(Signal::Bullish, Signal::Bearish), None);
        assert_eq!(trade_trigger(Signal::Neutral, Signal::Bullish), None);
        assert_eq!(trade_trigger(Signal::Neutral, Signal::Bearish), None);
        assert_eq!(trade_trigger(Signal::Neutral, Signal::Neutral), None);
    }

    #[test]
    fn test_classify_ties_are_bearish() {
        assert_eq!(classify(101.0, 100.0), Signal::Bullish);
        assert_eq!(classify(100.0, 100.0), Signal::Bearish);
        assert_eq!(classify(99.0, 100.0), Signal::Bearish);
    }

    #[test]
    fn test_validate_accepts_ascending_series_with_gap() {
        let candles = candles_at(&[0, 1, 2, 5, 6]);
        assert!(validate_candle_series(&candles, KlineInterval::OneHour).is_ok());
        assert!(validate_candle_series(&[], KlineInterval::OneHour).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_disorder() {
        let duplicated = candles_at(&[0, 1, 1, 2]);
        let err = validate_candle_series(&duplicated, KlineInterval::OneHour).unwrap_err();
        assert!(err.to_string().contains("not strictly ascending"));

        let reversed = candles_at(&[3, 2, 1]);
        assert!(validate_candle_series(&reversed, KlineInterval::OneHour).is_err());
    }
}
