use chrono::Utc;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::{KlineInterval, Lookback};
use crate::strategy::CrossoverConfig;

pub const API_KEY_VAR: &str = "BINANCE_API_KEY";
pub const API_SECRET_VAR: &str = "BINANCE_API_SECRET";

const DEFAULT_CONFIG_FILE: &str = "crossbot";
const ENV_PREFIX: &str = "CROSSBOT";
/// Binance spot history does not go back further than this
const MAX_HISTORY_DAYS: i64 = 3650;

/// Immutable parameters for one run of the bot
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoopConfig {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub interval: KlineInterval,
    pub history_window: Lookback,
    /// Quote-currency amount to spend per order
    pub base_balance: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub poll_interval_secs: u64,
    pub call_timeout_secs: u64,
    pub short_window: usize,
    pub long_window: usize,
    pub binance_base_url: String,
    pub recv_window_ms: u64,
    /// Validate orders against the exchange without executing them
    pub test_orders: bool,
}

/// Values that take precedence over file and environment (e.g. CLI flags)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub symbol: Option<String>,
    pub interval: Option<String>,
    pub base_balance: Option<f64>,
    pub poll_interval_secs: Option<u64>,
    pub test_orders: Option<bool>,
}

impl LoopConfig {
    /// Load defaults, then `crossbot.toml` (or `path`), then `CROSSBOT_*` env vars, then overrides
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("symbol", "BTCUSDT")?
            .set_default("base_asset", "BTC")?
            .set_default("quote_asset", "USDT")?
            .set_default("interval", "1h")?
            .set_default("history_window", "1 month ago UTC")?
            .set_default("base_balance", 65.0)?
            .set_default("stop_loss_pct", 0.05)?
            .set_default("take_profit_pct", 0.10)?
            .set_default("poll_interval_secs", 30_i64)?
            .set_default("call_timeout_secs", 10_i64)?
            .set_default("short_window", 50_i64)?
            .set_default("long_window", 200_i64)?
            .set_default("binance_base_url", "https://api.binance.com")?
            .set_default("recv_window_ms", 5000_i64)?
            .set_default("test_orders", false)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config: LoopConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("symbol", overrides.symbol)?
            .set_override_option("interval", overrides.interval)?
            .set_override_option("base_balance", overrides.base_balance)?
            .set_override_option("poll_interval_secs", overrides.poll_interval_secs.map(|s| s as i64))?
            .set_override_option("test_orders", overrides.test_orders)?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(invalid("symbol", "must not be empty"));
        }
        if !self.base_balance.is_finite() || self.base_balance <= 0.0 {
            return Err(invalid("base_balance", format!("must be positive, got {}", self.base_balance)));
        }
        for (field, pct) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
        ] {
            if !(0.0..1.0).contains(&pct) {
                return Err(invalid(field, format!("must be in [0, 1), got {}", pct)));
            }
        }
        let now = Utc::now();
        let history = now - self.history_window.start_from(now);
        if history > chrono::Duration::days(MAX_HISTORY_DAYS) {
            return Err(invalid(
                "history_window",
                format!("{} reaches back more than {} days", self.history_window, MAX_HISTORY_DAYS),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "must be at least 1"));
        }
        if self.call_timeout_secs == 0 {
            return Err(invalid("call_timeout_secs", "must be at least 1"));
        }
        if self.short_window == 0 || self.short_window >= self.long_window {
            return Err(invalid(
                "short_window",
                format!(
                    "must be positive and below long_window ({} vs {})",
                    self.short_window, self.long_window
                ),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn crossover(&self) -> CrossoverConfig {
        CrossoverConfig {
            short_period: self.short_window,
            long_period: self.long_window,
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USDT".to_string(),
            interval: KlineInterval::OneHour,
            history_window: Lookback::new(1, crate::models::LookbackUnit::Month),
            base_balance: 65.0,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            poll_interval_secs: 30,
            call_timeout_secs: 10,
            short_window: 50,
            long_window: 200,
            binance_base_url: "https://api.binance.com".to_string(),
            recv_window_ms: 5000,
            test_orders: false,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// API key pair. Both halves are required before the bot may start.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Blank values count as missing
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingCredential(name))
        };

        Ok(Self {
            api_key: read(API_KEY_VAR)?,
            api_secret: read(API_SECRET_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_runtime_parameters() {
        let config = LoopConfig::default();

        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.interval, KlineInterval::OneHour);
        assert_eq!(config.history_window.to_string(), "1 month ago UTC");
        assert_eq!(config.base_balance, 65.0);
        assert_eq!(config.stop_loss_pct, 0.05);
        assert_eq!(config.take_profit_pct, 0.10);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_with_overrides() {
        let path = std::env::temp_dir().join(format!("crossbot-test-{}.toml", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "symbol = \"ETHUSDT\"").unwrap();
            writeln!(file, "base_asset = \"ETH\"").unwrap();
            writeln!(file, "interval = \"4h\"").unwrap();
            writeln!(file, "history_window = \"2 weeks ago UTC\"").unwrap();
            writeln!(file, "base_balance = 100").unwrap();
        }

        let overrides = ConfigOverrides {
            base_balance: Some(40.0),
            test_orders: Some(true),
            ..Default::default()
        };
        let config = LoopConfig::load(Some(&path), overrides).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.symbol, "ETHUSDT");
        assert_eq!(config.base_asset, "ETH");
        assert_eq!(config.interval, KlineInterval::FourHours);
        assert_eq!(config.history_window.to_string(), "2 weeks ago UTC");
        assert_eq!(config.base_balance, 40.0);
        assert!(config.test_orders);
        // Untouched keys keep their defaults
        assert_eq!(config.quote_asset, "USDT");
        assert_eq!(config.long_window, 200);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = LoopConfig::load(
            Some(Path::new("/nonexistent/crossbot.toml")),
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = LoopConfig {
            stop_loss_pct: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "stop_loss_pct", .. })
        ));

        let config = LoopConfig {
            base_balance: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LoopConfig {
            short_window: 200,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LoopConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bounds_history_window() {
        let config = LoopConfig {
            history_window: "4000000000 days ago UTC".parse().unwrap(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "history_window", .. })
        ));

        let config = LoopConfig {
            history_window: "20 years ago UTC".parse().unwrap(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LoopConfig {
            history_window: "5 years ago UTC".parse().unwrap(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_require_both_values() {
        let creds = Credentials::from_lookup(lookup_from(&[
            (API_KEY_VAR, "key"),
            (API_SECRET_VAR, "secret"),
        ]))
        .unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.api_secret, "secret");

        let missing_secret = Credentials::from_lookup(lookup_from(&[(API_KEY_VAR, "key")]));
        assert!(matches!(
            missing_secret,
            Err(ConfigError::MissingCredential(API_SECRET_VAR))
        ));

        let blank_key = Credentials::from_lookup(lookup_from(&[
            (API_KEY_VAR, "   "),
            (API_SECRET_VAR, "secret"),
        ]));
        assert!(matches!(blank_key, Err(ConfigError::MissingCredential(API_KEY_VAR))));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::new("visible-key", "very-secret");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("very-secret"));
        assert!(!printed.contains("visible-key"));
    }
}
