use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::SymbolTradingRules;

/// Turn a desired quantity into one the exchange's lot-size filter accepts
///
/// Returns `None` when the rules could not be fetched, the quantity is not a
/// finite number, or it is too large to put on the step grid. The caller skips
/// the order in that case.
///
/// The quantity is raised to the minimum and then rounded to the *nearest*
/// step (half to even), so it can land one step above the raw amount and
/// even above `max_quantity`. The latter is logged, not clamped.
pub fn normalize_quantity(raw_quantity: f64, rules: Option<&SymbolTradingRules>) -> Option<Decimal> {
    let rules = rules?;
    let raw = Decimal::from_f64(raw_quantity)?;
    adjust_to_rules(raw, rules)
}

/// Exact-decimal core of [`normalize_quantity`]. `None` if the step math overflows.
pub fn adjust_to_rules(raw: Decimal, rules: &SymbolTradingRules) -> Option<Decimal> {
    let min = rules.min_quantity;
    let step = rules.step_size;

    let mut adjusted = raw.max(min);

    if step > Decimal::ZERO {
        let steps = adjusted
            .checked_div(step)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        adjusted = steps.checked_mul(step)?;

        // Only reachable when min_quantity is not itself a multiple of the step
        if adjusted < min {
            adjusted = min.checked_div(step)?.ceil().checked_mul(step)?;
        }
    } else {
        adjusted = adjusted.round_dp_with_strategy(rules.quantity_precision, RoundingStrategy::ToZero);
    }

    let adjusted = adjusted.normalize();

    if let Some(max) = rules.max_quantity {
        if max > Decimal::ZERO && adjusted > max {
            tracing::warn!(
                symbol = %rules.symbol,
                quantity = %adjusted,
                max_quantity = %max,
                "Adjusted quantity exceeds the exchange maximum, submitting anyway"
            );
        }
    }

    Some(adjusted)
}
