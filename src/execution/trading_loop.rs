use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

use crate::api::ExchangeClient;
use crate::config::LoopConfig;
use crate::error::{CycleError, ExchangeError};
use crate::execution::executor::{available_notional, ExecutionAction, Executor, SkipReason};
use crate::execution::quantity::normalize_quantity;
use crate::models::{OrderReceipt, OrderType, TradeSide};
use crate::strategy::signals::validate_candle_series;
use crate::strategy::Strategy;

/// How a single iteration ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The exchange returned no candles
    NoData,
    /// Not enough candles for the long average yet
    NotReady { candles: usize, required: usize },
    InvalidSeries(String),
    Skipped(SkipReason),
    /// Trading rules could not be fetched, so the quantity could not be normalized
    RulesUnavailable,
    ZeroQuantity,
    OrderPlaced(OrderReceipt),
}

/// Poll, evaluate, and trade one symbol until told to stop
pub struct TradingLoop<E, S> {
    exchange: E,
    strategy: S,
    executor: Executor,
    config: LoopConfig,
    poll_interval: Duration,
    call_timeout: Duration,
}

impl<E: ExchangeClient, S: Strategy> TradingLoop<E, S> {
    pub fn new(exchange: E, strategy: S, config: LoopConfig) -> Self {
        Self {
            executor: Executor::new(&config),
            poll_interval: config.poll_interval(),
            call_timeout: config.call_timeout(),
            exchange,
            strategy,
            config,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Run cycles until `shutdown` flips to true or its sender is dropped
    ///
    /// Cycle errors are logged and never end the loop. Shutdown is observed
    /// between cycles and while sleeping, never in the middle of an order.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "🔄 Trading loop started: {} {} ({} strategy, polling every {:?})",
            self.config.symbol,
            self.config.interval,
            self.strategy.name(),
            self.poll_interval
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_cycle().await {
                Ok(outcome) => tracing::info!(?outcome, "Cycle complete"),
                Err(e) if e.is_retryable() => {
                    tracing::warn!("⚠️  Cycle failed, retrying next poll: {}", e)
                }
                Err(e) => tracing::error!("❌ Cycle failed: {}", e),
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Trading loop stopped");
    }

    /// One pass: fetch candles, evaluate, and submit at most one order
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let config = &self.config;

        let candles = self
            .call(self.exchange.get_historical_candles(
                &config.symbol,
                config.interval,
                config.history_window,
            ))
            .await
            .map_err(CycleError::Fetch)?;

        if candles.is_empty() {
            tracing::warn!("No candles returned for {}", config.symbol);
            return Ok(CycleOutcome::NoData);
        }

        if let Err(e) = validate_candle_series(&candles, config.interval) {
            tracing::warn!("Discarding candle series for {}: {}", config.symbol, e);
            return Ok(CycleOutcome::InvalidSeries(e.to_string()));
        }

        let state = match self.strategy.evaluate(&candles) {
            Some(state) => state,
            None => {
                let required = self.strategy.min_candles_required();
                tracing::info!(
                    "⏳ Waiting for data: {}/{} candles for {}",
                    candles.len(),
                    required,
                    config.symbol
                );
                return Ok(CycleOutcome::NotReady {
                    candles: candles.len(),
                    required,
                });
            }
        };

        tracing::info!(
            close = state.close,
            short_average = state.short_average,
            long_average = state.long_average,
            signal = ?state.signal,
            previous = ?state.position_signal,
            "📊 {} @ {}",
            config.symbol,
            state.open_time.format("%Y-%m-%d %H:%M")
        );

        let decision = self.executor.plan(&state);
        let intent = match decision.action {
            ExecutionAction::Execute { intent } => intent,
            ExecutionAction::Skip(reason) => {
                tracing::debug!("{}", decision.reason);
                return Ok(CycleOutcome::Skipped(reason));
            }
        };

        tracing::info!(
            "🎯 {} {}: price {:.2}, stop loss {:.2}, take profit {:.2}",
            intent.side,
            intent.symbol,
            intent.reference_price,
            intent.stop_loss_price,
            intent.take_profit_price
        );

        let asset = match intent.side {
            TradeSide::Buy => &config.quote_asset,
            TradeSide::Sell => &config.base_asset,
        };
        let free_balance = match self.call(self.exchange.get_balance(asset)).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!("Failed to fetch {} balance, assuming zero: {}", asset, e);
                0.0
            }
        };
        let available = available_notional(intent.side, free_balance, intent.reference_price);

        let decision = self.executor.check_balance(intent, available);
        let mut intent = match decision.action {
            ExecutionAction::Execute { intent } => intent,
            ExecutionAction::Skip(reason) => {
                tracing::warn!("⚠️  {}", decision.reason);
                return Ok(CycleOutcome::Skipped(reason));
            }
        };

        let rules = match self.call(self.exchange.get_symbol_rules(&config.symbol)).await {
            Ok(rules) => Some(rules),
            Err(e) => {
                tracing::warn!("Failed to fetch trading rules for {}: {}", config.symbol, e);
                None
            }
        };
        let quantity = match normalize_quantity(intent.raw_quantity, rules.as_ref()) {
            Some(quantity) => quantity,
            None => {
                tracing::warn!(
                    "Skipping order: cannot normalize {} for {}",
                    intent.raw_quantity,
                    config.symbol
                );
                return Ok(CycleOutcome::RulesUnavailable);
            }
        };
        if quantity <= Decimal::ZERO {
            tracing::warn!(
                "Skipping order: {} rounds to zero for {}",
                intent.raw_quantity,
                config.symbol
            );
            return Ok(CycleOutcome::ZeroQuantity);
        }
        intent.adjusted_quantity = Some(quantity);

        let receipt = self
            .call(
                self.exchange
                    .submit_order(&intent.symbol, intent.side, quantity, OrderType::Market),
            )
            .await
            .map_err(CycleError::OrderSubmission)?;

        tracing::info!(
            "✅ {} {} {} submitted (status {}, client id {})",
            receipt.side,
            quantity,
            receipt.symbol,
            receipt.status,
            receipt.client_order_id
        );

        Ok(CycleOutcome::OrderPlaced(receipt))
    }

    async fn call<T, F>(&self, request: F) -> Result<T, ExchangeError>
    where
        F: Future<Output = Result<T, ExchangeError>>,
    {
        match tokio::time::timeout(self.call_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ExchangeError::Timeout(self.call_timeout)),
        }
    }
}
