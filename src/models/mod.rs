pub mod interval;

pub use interval::{KlineInterval, Lookback, LookbackUnit};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candlestick for one kline interval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Relative position of the short moving average against the long one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Bullish,
    Bearish,
    /// Averages not yet warmed up
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Wire representation used by the exchange
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderType {
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
        }
    }
}

/// An order the bot wants to place this cycle. Never persisted.
///
/// Stop-loss and take-profit are informational only: they are logged next to
/// the order but no conditional order is ever sent for them.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: TradeSide,
    pub reference_price: f64,
    pub raw_quantity: f64,
    pub adjusted_quantity: Option<Decimal>,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
}

impl OrderIntent {
    /// Notional value of the unadjusted quantity at the reference price
    pub fn notional(&self) -> f64 {
        self.raw_quantity * self.reference_price
    }
}

/// Lot-size constraints for a symbol, as published by the exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolTradingRules {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub min_quantity: Decimal,
    pub max_quantity: Option<Decimal>,
    /// Zero means the quantity is not quantized
    pub step_size: Decimal,
    pub quantity_precision: u32,
}

/// Acknowledgement returned after submitting an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReceipt {
    pub symbol: String,
    pub order_id: Option<i64>,
    pub client_order_id: String,
    pub side: TradeSide,
    pub status: String,
    pub executed_quantity: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_side_wire_format() {
        assert_eq!(TradeSide::Buy.as_str(), "BUY");
        assert_eq!(TradeSide::Sell.to_string(), "SELL");
        assert_eq!(OrderType::Market.as_str(), "MARKET");
    }

    #[test]
    fn test_order_intent_notional() {
        let intent = OrderIntent {
            symbol: "BTCUSDT".to_string(),
            side: TradeSide::Buy,
            reference_price: 50000.0,
            raw_quantity: 65.0 / 50000.0,
            adjusted_quantity: None,
            stop_loss_price: 47500.0,
            take_profit_price: 55000.0,
        };

        assert!((intent.notional() - 65.0).abs() < 1e-9);
    }
}
