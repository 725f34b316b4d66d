use std::time::Duration;
use thiserror::Error;

/// Failure talking to the exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("exchange rejected request (HTTP {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("symbol {0} is not listed on the exchange")]
    UnknownSymbol(String),

    #[error("failed to sign request: {0}")]
    Signing(String),
}

impl ExchangeError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ExchangeError::Transport(_) | ExchangeError::Timeout(_) => true,
            ExchangeError::Api { status, .. } => *status == 429 || *status >= 500,
            ExchangeError::Decode(_)
            | ExchangeError::UnknownSymbol(_)
            | ExchangeError::Signing(_) => false,
        }
    }
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: {0} must be set in the environment")]
    MissingCredential(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors that abort a single loop iteration. The loop logs them and carries on.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to fetch market data: {0}")]
    Fetch(#[source] ExchangeError),

    #[error("order submission failed: {0}")]
    OrderSubmission(#[source] ExchangeError),
}

impl CycleError {
    pub fn exchange_error(&self) -> &ExchangeError {
        match self {
            CycleError::Fetch(e) | CycleError::OrderSubmission(e) => e,
        }
    }

    /// A transient fetch failure that the next cycle will simply retry.
    /// Order submissions are never in this class, even on transport errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            CycleError::Fetch(e) => e.is_transient(),
            CycleError::OrderSubmission(_) => false,
        }
    }
}
