// Risk management module
pub mod targets;

pub use targets::{calculate_risk_targets, RiskTargets};
