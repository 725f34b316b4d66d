use anyhow::{Context, Result};
use clap::Parser;
use crossbot::api::BinanceClient;
use crossbot::config::{ConfigOverrides, Credentials, LoopConfig};
use crossbot::execution::TradingLoop;
use crossbot::strategy::{MaCrossoverStrategy, Strategy};
use std::path::PathBuf;
use tokio::sync::watch;

// ============================================================================
// Command Line
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "crossbot", about = "Moving-average crossover trading bot for Binance spot")]
struct Args {
    /// Config file (defaults to ./crossbot.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trading pair, e.g. BTCUSDT
    #[arg(long)]
    symbol: Option<String>,

    /// Kline interval code, e.g. 1h
    #[arg(long)]
    interval: Option<String>,

    /// Quote-currency amount to spend per order
    #[arg(long)]
    base_balance: Option<f64>,

    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Send orders to the validation endpoint instead of executing them
    #[arg(long)]
    test_orders: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            symbol: self.symbol.clone(),
            interval: self.interval.clone(),
            base_balance: self.base_balance,
            poll_interval_secs: self.poll_interval_secs,
            test_orders: self.test_orders.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();

    tracing::info!("🚀 CrossBot starting");

    let config = LoopConfig::load(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;
    let credentials = Credentials::from_env().context("Refusing to start without API credentials")?;

    tracing::info!(
        "Trading {} on {} candles, {} {} per order, stop loss {:.1}%, take profit {:.1}%",
        config.symbol,
        config.interval,
        config.base_balance,
        config.quote_asset,
        config.stop_loss_pct * 100.0,
        config.take_profit_pct * 100.0
    );
    if config.test_orders {
        tracing::info!("🧪 Test-order mode: orders are validated but not executed");
    }

    let exchange = BinanceClient::from_config(&config, credentials)
        .context("Failed to build exchange client")?;
    let strategy = MaCrossoverStrategy::new(config.crossover());
    tracing::info!(
        "Strategy {} needs {} candles of history",
        strategy.name(),
        strategy.min_candles_required()
    );

    let trading_loop = TradingLoop::new(exchange, strategy, config);

    if args.once {
        match trading_loop.run_cycle().await {
            Ok(outcome) => tracing::info!(?outcome, "Single cycle complete"),
            Err(e) => tracing::error!("❌ Cycle failed: {}", e),
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run = trading_loop.run(shutdown_rx);
    tokio::pin!(run);

    // Wait for Ctrl+C, then let the loop finish its current cycle
    let exited = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");
            false
        }
        _ = &mut run => {
            tracing::error!("Trading loop exited unexpectedly");
            true
        }
    };

    if !exited {
        shutdown_tx.send(true).ok();
        run.await;
    }

    tracing::info!("👋 CrossBot stopped");
    Ok(())
}

// ============================================================================
// Setup
// ============================================================================

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crossbot=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
