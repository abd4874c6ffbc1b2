//! Signal Engine Binary
//!
//! Starts the sentinel against three Alpaca accounts and executes signals
//! read as JSON lines from stdin.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin signal-engine
//! echo '{"kind":"equity","action":"buy","symbol":"AAPL"}' | cargo run --bin signal-engine
//! ```
//!
//! # Environment Variables
//!
//! - `SIGNAL_ENGINE_CONFIG`: Config file path (default: config.yaml)
//! - `ALPACA_*`: Interpolated into the config file
//! - `RUST_LOG`: Log filter (overrides the configured level)

use std::sync::Arc;

use anyhow::Context;
use signal_engine::application::ports::{BrokerPort, SettingsPort, TimeSourcePort};
use signal_engine::application::services::{Sentinel, SentinelConfig};
use signal_engine::application::{EngineContext, ProductBrokers};
use signal_engine::config::{Config, load_config};
use signal_engine::domain::position::{PairedPositionRepository, PositionRepository};
use signal_engine::domain::shared::ProductLine;
use signal_engine::infrastructure::broker::AlpacaBrokerAdapter;
use signal_engine::infrastructure::persistence::{
    InMemoryPairedPositionRepository, InMemoryPositionRepository, InMemorySettingsRepository,
    InMemorySignalHistory,
};
use signal_engine::infrastructure::time::{SntpClock, SystemClock};
use signal_engine::observability::{MetricsConfig, init_metrics, init_tracing};
use signal_engine::{Signal, SignalEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Concrete context wired by the binary.
type LiveContext = EngineContext<
    AlpacaBrokerAdapter,
    InMemoryPositionRepository,
    InMemoryPairedPositionRepository,
    InMemorySettingsRepository,
>;

/// Concrete engine wired by the binary.
type LiveEngine = SignalEngine<
    AlpacaBrokerAdapter,
    InMemoryPositionRepository,
    InMemoryPairedPositionRepository,
    InMemorySettingsRepository,
>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let path = std::env::var("SIGNAL_ENGINE_CONFIG").ok();
    let config = load_config(path.as_deref()).context("loading configuration")?;

    init_tracing(Some(&config.observability.logging.level))
        .context("installing tracing subscriber")?;

    tracing::info!(
        environment = %config.environment.mode,
        sentinel_enabled = config.sentinel.enabled,
        ntp_enabled = config.time.ntp_enabled,
        "Starting Signal Engine"
    );

    if config.observability.metrics.enabled {
        let metrics = MetricsConfig::with_addr(config.observability.metrics.listen_addr);
        init_metrics(&metrics).context("installing metrics exporter")?;
        tracing::info!(addr = %metrics.listen_addr, "Metrics exporter listening");
    }

    let context = Arc::new(create_context(&config)?);
    let engine = SignalEngine::new(Arc::clone(&context));
    let shutdown = CancellationToken::new();

    let sentinel = if config.sentinel.enabled {
        let sentinel_config = config.sentinel.to_config();
        let handle = if config.time.ntp_enabled {
            let clock = Arc::new(SntpClock::new(config.time.sntp()));
            spawn_sentinel(&context, clock, sentinel_config, shutdown.clone())
        } else {
            spawn_sentinel(&context, Arc::new(SystemClock), sentinel_config, shutdown.clone())
        };
        Some(handle)
    } else {
        tracing::info!("Sentinel disabled");
        None
    };

    tracing::info!("Signal engine ready");

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    // A signal being executed finishes before shutdown proceeds.
    read_signals(&engine, &shutdown).await;
    if !shutdown.is_cancelled() {
        tracing::info!("Signal input closed");
        shutdown.cancelled().await;
    }

    if let Some(handle) = sentinel
        && let Err(e) = handle.await
    {
        tracing::error!(error = %e, "Sentinel task failed");
    }

    tracing::info!("Signal engine stopped");
    Ok(())
}

/// Build one adapter per product account plus the in-memory stores.
fn create_context(config: &Config) -> anyhow::Result<LiveContext> {
    let environment = config.environment.alpaca_environment();
    let adapter = |product: ProductLine| -> anyhow::Result<Arc<AlpacaBrokerAdapter>> {
        let alpaca = config.brokers.alpaca_config(product, environment);
        let broker = AlpacaBrokerAdapter::new(&alpaca, product)
            .with_context(|| format!("creating {product} broker adapter"))?;
        tracing::info!(
            product = %product,
            environment = %environment,
            "AlpacaBrokerAdapter initialized"
        );
        Ok(Arc::new(broker))
    };

    let brokers = ProductBrokers::new(
        adapter(ProductLine::Equities)?,
        adapter(ProductLine::Options)?,
        adapter(ProductLine::ShortEquities)?,
    );
    let settings =
        InMemorySettingsRepository::new(config.trading.settings(), config.trading.switches());

    Ok(EngineContext::new(
        brokers,
        Arc::new(InMemoryPositionRepository::new()),
        Arc::new(InMemoryPairedPositionRepository::new()),
        Arc::new(settings),
        config.execution_policy(),
    )
    .with_history(Arc::new(InMemorySignalHistory::new())))
}

fn spawn_sentinel<B, R, P, S, C>(
    context: &Arc<EngineContext<B, R, P, S>>,
    clock: Arc<C>,
    config: SentinelConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    B: BrokerPort + 'static,
    R: PositionRepository + 'static,
    P: PairedPositionRepository + 'static,
    S: SettingsPort + 'static,
    C: TimeSourcePort + 'static,
{
    Arc::new(Sentinel::new(Arc::clone(context), clock, config)).spawn(shutdown)
}

/// Execute newline-delimited JSON signals from stdin and print each outcome.
async fn read_signals(engine: &LiveEngine, shutdown: &CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => return,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read signal input");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let outcome = match serde_json::from_str::<Signal>(&line) {
            Ok(signal) => engine.dispatch(signal).await,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed signal");
                continue;
            }
        };
        match serde_json::to_string(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "Failed to encode outcome"),
        }
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Walk up from the working directory looking for a `.env` file.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
