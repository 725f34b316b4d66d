use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::ExchangeClient;
use crate::config::{Credentials, LoopConfig};
use crate::error::ExchangeError;
use crate::models::{
    Candle, KlineInterval, Lookback, OrderReceipt, OrderType, SymbolTradingRules, TradeSide,
};

// Spot REST API
// Docs: https://developers.binance.com/docs/binance-spot-api-docs/rest-api
pub const BINANCE_API_BASE: &str = "https://api.binance.com";
const KLINES_PAGE_LIMIT: usize = 1000;
const RATE_LIMIT_RPM: u32 = 600; // Well under the 6000 weight/min IP budget
const INVALID_SYMBOL_CODE: i64 = -1121;

type HmacSha256 = Hmac<Sha256>;

// Type alias for the rate limiter to simplify signatures
type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Authenticated Binance spot REST client
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    recv_window_ms: u64,
    timeout: Duration,
    test_orders: bool,
    rate_limiter: Arc<BinanceRateLimiter>,
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    asset: String,
    free: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    base_asset_precision: u32,
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        min_qty: String,
        max_qty: String,
        step_size: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    symbol: String,
    order_id: i64,
    client_order_id: String,
    status: String,
    #[serde(default)]
    executed_qty: Option<String>,
}

// ============== Implementation ==============

impl BinanceClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, ExchangeError> {
        let client = Client::builder().timeout(timeout).build()?;

        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client,
            base_url: BINANCE_API_BASE.to_string(),
            credentials,
            recv_window_ms: 5000,
            timeout,
            test_orders: false,
            rate_limiter,
        })
    }

    /// Build a client from the run configuration
    pub fn from_config(config: &LoopConfig, credentials: Credentials) -> Result<Self, ExchangeError> {
        Ok(Self::new(credentials, config.call_timeout())?
            .with_base_url(&config.binance_base_url)
            .with_recv_window(config.recv_window_ms)
            .with_test_orders(config.test_orders))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// Route orders to `/api/v3/order/test`, which validates without executing
    pub fn with_test_orders(mut self, test_orders: bool) -> Self {
        self.test_orders = test_orders;
        self
    }

    /// Append timestamp and recvWindow to `query` and sign it
    fn signed_query(&self, query: &str) -> Result<String, ExchangeError> {
        let mut query = query.to_string();
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={}&timestamp={}",
            self.recv_window_ms,
            Utc::now().timestamp_millis()
        ));

        let signature = sign(&self.credentials.api_secret, &query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    fn request(&self, method: Method, path: &str, query: &str) -> RequestBuilder {
        let url = if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        };
        self.client.request(method, url)
    }

    fn signed_request(
        &self,
        method: Method,
        path: &str,
        query: &str,
    ) -> Result<RequestBuilder, ExchangeError> {
        Ok(self
            .request(method, path, &self.signed_query(query)?)
            .header("X-MBX-APIKEY", &self.credentials.api_key))
    }

    /// Send a rate-limited request and decode a successful JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ExchangeError> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(parse_api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Decode(format!("{} (body: {})", e, truncate(&body, 200))))
    }

    fn map_transport(&self, error: reqwest::Error) -> ExchangeError {
        if error.is_timeout() {
            ExchangeError::Timeout(self.timeout)
        } else {
            ExchangeError::Transport(error)
        }
    }

    async fn fetch_klines_page(
        &self,
        symbol: &str,
        interval: KlineInterval,
        start_ms: i64,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let query = format!(
            "symbol={}&interval={}&startTime={}&limit={}",
            symbol, interval, start_ms, KLINES_PAGE_LIMIT
        );

        let rows: Vec<Vec<serde_json::Value>> = self
            .send(self.request(Method::GET, "/api/v3/klines", &query))
            .await?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn get_balance(&self, asset: &str) -> Result<f64, ExchangeError> {
        let account: AccountResponse = self
            .send(self.signed_request(Method::GET, "/api/v3/account", "")?)
            .await?;

        match account.balances.iter().find(|b| b.asset == asset) {
            Some(entry) => entry
                .free
                .parse()
                .map_err(|_| ExchangeError::Decode(format!("bad {} balance '{}'", asset, entry.free))),
            None => Ok(0.0),
        }
    }

    /// Pages through `/api/v3/klines` from the lookback start until a short page
    async fn get_historical_candles(
        &self,
        symbol: &str,
        interval: KlineInterval,
        lookback: Lookback,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let mut start_ms = lookback.start_from(Utc::now()).timestamp_millis();
        let mut candles: Vec<Candle> = Vec::new();

        loop {
            let page = self.fetch_klines_page(symbol, interval, start_ms).await?;
            let page_len = page.len();

            let next_start = match page.last() {
                Some(last) => last.open_time.timestamp_millis() + 1,
                None => break,
            };
            candles.extend(page);

            if page_len < KLINES_PAGE_LIMIT || next_start <= start_ms {
                break;
            }
            start_ms = next_start;
        }

        candles.sort_by_key(|c| c.open_time);
        candles.dedup_by_key(|c| c.open_time);

        tracing::debug!(
            "Fetched {} {} candles for {} ({})",
            candles.len(),
            interval,
            symbol,
            lookback
        );

        Ok(candles)
    }

    async fn get_symbol_rules(&self, symbol: &str) -> Result<SymbolTradingRules, ExchangeError> {
        let query = format!("symbol={}", symbol);
        let info: ExchangeInfoResponse = self
            .send(self.request(Method::GET, "/api/v3/exchangeInfo", &query))
            .await
            .map_err(|e| match e {
                ExchangeError::Api { code, .. } if code == INVALID_SYMBOL_CODE => {
                    ExchangeError::UnknownSymbol(symbol.to_string())
                }
                other => other,
            })?;

        let info = info
            .symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))?;

        symbol_rules(info)
    }

    async fn submit_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: Decimal,
        order_type: OrderType,
    ) -> Result<OrderReceipt, ExchangeError> {
        let client_order_id = new_client_order_id();
        let query = format!(
            "symbol={}&side={}&type={}&quantity={}&newClientOrderId={}",
            symbol,
            side.as_str(),
            order_type.as_str(),
            quantity.normalize(),
            client_order_id
        );

        if self.test_orders {
            let _: serde_json::Value = self
                .send(self.signed_request(Method::POST, "/api/v3/order/test", &query)?)
                .await?;

            return Ok(OrderReceipt {
                symbol: symbol.to_string(),
                order_id: None,
                client_order_id,
                side,
                status: "TEST".to_string(),
                executed_quantity: None,
            });
        }

        let order: OrderResponse = self
            .send(self.signed_request(Method::POST, "/api/v3/order", &query)?)
            .await?;

        Ok(OrderReceipt {
            symbol: order.symbol,
            order_id: Some(order.order_id),
            client_order_id: order.client_order_id,
            side,
            status: order.status,
            executed_quantity: order
                .executed_qty
                .as_deref()
                .and_then(|q| Decimal::from_str(q).ok()),
        })
    }
}

// ============== Helpers ==============

/// Hex-encoded HMAC-SHA256 of `payload`
pub fn sign(secret: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Signing(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn new_client_order_id() -> String {
    // Binance caps client order ids at 36 characters
    format!("cb-{}", Uuid::new_v4().simple())
}

fn parse_api_error(status: u16, body: &str) -> ExchangeError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => ExchangeError::Api {
            status,
            code: err.code,
            message: err.msg,
        },
        Err(_) => ExchangeError::Api {
            status,
            code: 0,
            message: truncate(body, 200).to_string(),
        },
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Kline rows are positional arrays: [openTime, open, high, low, close, volume, closeTime, ...]
fn parse_kline(row: &[serde_json::Value]) -> Result<Candle, ExchangeError> {
    if row.len() < 6 {
        return Err(ExchangeError::Decode(format!(
            "kline row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_time_ms = row[0]
        .as_i64()
        .ok_or_else(|| ExchangeError::Decode(format!("bad kline open time {}", row[0])))?;
    let open_time = DateTime::<Utc>::from_timestamp_millis(open_time_ms)
        .ok_or_else(|| ExchangeError::Decode(format!("kline open time {} out of range", open_time_ms)))?;

    let number = |idx: usize, name: &str| -> Result<f64, ExchangeError> {
        row[idx]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| ExchangeError::Decode(format!("bad kline {} {}", name, row[idx])))
    };

    Ok(Candle {
        open_time,
        open: number(1, "open")?,
        high: number(2, "high")?,
        low: number(3, "low")?,
        close: number(4, "close")?,
        volume: number(5, "volume")?,
    })
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ExchangeError> {
    Decimal::from_str(value)
        .map_err(|_| ExchangeError::Decode(format!("bad {} '{}'", field, value)))
}

/// Without a LOT_SIZE filter the quantity is unconstrained
fn symbol_rules(info: SymbolInfo) -> Result<SymbolTradingRules, ExchangeError> {
    let lot_size = info.filters.iter().find_map(|f| match f {
        SymbolFilter::LotSize {
            min_qty,
            max_qty,
            step_size,
        } => Some((min_qty, max_qty, step_size)),
        SymbolFilter::Other => None,
    });

    let (min_quantity, max_quantity, step_size) = match lot_size {
        Some((min_qty, max_qty, step_size)) => (
            parse_decimal("minQty", min_qty)?,
            Some(parse_decimal("maxQty", max_qty)?),
            parse_decimal("stepSize", step_size)?,
        ),
        None => {
            tracing::warn!("{} has no LOT_SIZE filter, quantities pass through", info.symbol);
            (Decimal::ZERO, None, Decimal::ZERO)
        }
    };

    Ok(SymbolTradingRules {
        symbol: info.symbol,
        base_asset: info.base_asset,
        quote_asset: info.quote_asset,
        min_quantity,
        max_quantity,
        step_size,
        quantity_precision: info.base_asset_precision,
    })
}
