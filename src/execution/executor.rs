use crate::config::LoopConfig;
use crate::models::{OrderIntent, Signal, TradeSide};
use crate::risk::calculate_risk_targets;
use crate::strategy::SignalState;

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The latest two candles did not agree on a direction
    NoTrigger { signal: Signal, previous: Signal },
    InvalidPrice(f64),
    InsufficientBalance { required: f64, available: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    Execute { intent: OrderIntent },
    Skip(SkipReason),
}

#[derive(Debug, Clone)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

/// Turns a signal state into an order intent, sized from the configured
/// quote budget, and checks it against what the account can pay for
#[derive(Debug, Clone)]
pub struct Executor {
    symbol: String,
    base_balance: f64,
    stop_loss_pct: f64,
    take_profit_pct: f64,
}

impl Executor {
    pub fn new(config: &LoopConfig) -> Self {
        Self {
            symbol: config.symbol.clone(),
            base_balance: config.base_balance,
            stop_loss_pct: config.stop_loss_pct,
            take_profit_pct: config.take_profit_pct,
        }
    }

    /// Build an order intent if the signal is confirmed
    pub fn plan(&self, state: &SignalState) -> ExecutionDecision {
        let side = match state.trigger() {
            Some(side) => side,
            None => {
                return ExecutionDecision {
                    action: ExecutionAction::Skip(SkipReason::NoTrigger {
                        signal: state.signal,
                        previous: state.position_signal,
                    }),
                    reason: format!(
                        "No confirmed crossover ({:?} after {:?})",
                        state.signal, state.position_signal
                    ),
                }
            }
        };

        let current_price = state.close;
        if !current_price.is_finite() || current_price <= 0.0 {
            return ExecutionDecision {
                action: ExecutionAction::Skip(SkipReason::InvalidPrice(current_price)),
                reason: format!("Cannot size an order at price {}", current_price),
            };
        }

        let targets = calculate_risk_targets(current_price, self.stop_loss_pct, self.take_profit_pct);
        let intent = OrderIntent {
            symbol: self.symbol.clone(),
            side,
            reference_price: current_price,
            raw_quantity: self.base_balance / current_price,
            adjusted_quantity: None,
            stop_loss_price: targets.stop_loss_price,
            take_profit_price: targets.take_profit_price,
        };

        ExecutionDecision {
            reason: format!("{} signal confirmed over two candles", side),
            action: ExecutionAction::Execute { intent },
        }
    }

    /// Skip the order when its notional exceeds what is available
    ///
    /// `available_notional` is in quote currency: the free quote balance for
    /// buys, the free base balance valued at the reference price for sells.
    pub fn check_balance(&self, intent: OrderIntent, available_notional: f64) -> ExecutionDecision {
        let required = intent.notional();

        if required > available_notional {
            return ExecutionDecision {
                action: ExecutionAction::Skip(SkipReason::InsufficientBalance {
                    required,
                    available: available_notional,
                }),
                reason: format!(
                    "Insufficient balance: need {:.2}, available {:.2}",
                    required, available_notional
                ),
            };
        }

        ExecutionDecision {
            action: ExecutionAction::Execute { intent },
            reason: "Balance covers order".to_string(),
        }
    }
}

/// Value a free balance in quote currency for the given side
pub fn available_notional(side: TradeSide, free_balance: f64, price: f64) -> f64 {
    match side {
        TradeSide::Buy => free_balance,
        TradeSide::Sell => free_balance * price,
    }
}
