use serde::{Deserialize, Serialize};

/// Stop-loss and take-profit levels around a reference price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskTargets {
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
}

/// Static percentage offsets from `price`. Percentages are fractions in [0, 1).
pub fn calculate_risk_targets(
    price: f64,
    stop_loss_pct: f64,
    take_profit_pct: f64,
) -> RiskTargets {
    RiskTargets {
        stop_loss_price: price * (1.0 - stop_loss_pct),
        take_profit_price: price * (1.0 + take_profit_pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_btc_targets() {
        let targets = calculate_risk_targets(50000.0, 0.05, 0.10);

        assert!((targets.stop_loss_price - 47500.0).abs() < 1e-6);
        assert!((targets.take_profit_price - 55000.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_offsets_collapse_to_price() {
        let targets = calculate_risk_targets(123.45, 0.0, 0.0);
        assert_eq!(targets.stop_loss_price, 123.45);
        assert_eq!(targets.take_profit_price, 123.45);
    }

    #[test]
    fn test_targets_bracket_price() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let price = rng.gen_range(0.0001..1_000_000.0);
            let stop_loss_pct = rng.gen_range(0.001..0.999);
            let take_profit_pct = rng.gen_range(0.001..0.999);

            let targets = calculate_risk_targets(price, stop_loss_pct, take_profit_pct);
            assert!(
                targets.stop_loss_price < price && price < targets.take_profit_price,
                "price {} sl {} tp {}",
                price,
                targets.stop_loss_price,
                targets.take_profit_price
            );
        }
    }
}
