pub mod binance;

pub use binance::BinanceClient;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::error::ExchangeError;
use crate::models::{
    Candle, KlineInterval, Lookback, OrderReceipt, OrderType, SymbolTradingRules, TradeSide,
};

/// Everything the trading loop needs from an exchange
///
/// Implementations report failures as typed errors; the loop decides which of
/// them are "no data this cycle" and which drop an order.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Free (unlocked) balance of `asset`. Unlisted assets have a zero balance.
    async fn get_balance(&self, asset: &str) -> Result<f64, ExchangeError>;

    /// Candles from `lookback` ago until now, ascending by open time
    async fn get_historical_candles(
        &self,
        symbol: &str,
        interval: KlineInterval,
        lookback: Lookback,
    ) -> Result<Vec<Candle>, ExchangeError>;

    async fn get_symbol_rules(&self, symbol: &str) -> Result<SymbolTradingRules, ExchangeError>;

    async fn submit_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: Decimal,
        order_type: OrderType,
    ) -> Result<OrderReceipt, ExchangeError>;
}

#[async_trait]
impl<T: ExchangeClient + ?Sized> ExchangeClient for Arc<T> {
    async fn get_balance(&self, asset: &str) -> Result<f64, ExchangeError> {
        (**self).get_balance(asset).await
    }

    async fn get_historical_candles(
        &self,
        symbol: &str,
        interval: KlineInterval,
        lookback: Lookback,
    ) -> Result<Vec<Candle>, ExchangeError> {
        (**self).get_historical_candles(symbol, interval, lookback).await
    }

    async fn get_symbol_rules(&self, symbol: &str) -> Result<SymbolTradingRules, ExchangeError> {
        (**self).get_symbol_rules(symbol).await
    }

    async fn submit_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: Decimal,
        order_type: OrderType,
    ) -> Result<OrderReceipt, ExchangeError> {
        (**self).submit_order(symbol, side, quantity, order_type).await
    }
}
