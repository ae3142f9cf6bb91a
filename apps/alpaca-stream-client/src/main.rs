//! Alpaca Stream Client Binary
//!
//! Connects to the market data stream, subscribes, and logs decoded
//! messages until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin alpaca-stream-client
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALPACA_KEY`: Alpaca API key
//! - `ALPACA_SECRET`: Alpaca API secret
//!
//! ## Optional
//! - `ALPACA_ENV`: PAPER | LIVE (default: PAPER)
//! - `ALPACA_FEED`: sip | iex | delayed_sip | opra | indicative (default: sip)
//! - `ALPACA_STREAM_URL`: Override the stream URL
//! - `ALPACA_SYMBOLS`: Comma-separated symbols (default: SPY)
//! - `ALPACA_CHANNELS`: Comma-separated channels (default: trades,quotes)
//! - `ALPACA_FRAME_POOL_SIZE`: Frames leased at once (default: 8)
//! - `ALPACA_METRICS_PORT`: Prometheus exporter port (disabled if unset)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: alpaca-stream-client)
//! - `RUST_LOG`: Log filter (default: info)

use std::net::SocketAddr;

use alpaca_stream_client::infrastructure::metrics::init_metrics;
use alpaca_stream_client::infrastructure::telemetry;
use alpaca_stream_client::{
    ClientConfig, PayloadDecoder, ShutdownCoordinator, StreamConnection, StreamReader,
    WsConnector,
};
use anyhow::Context;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("a rustls crypto provider is already installed"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    tracing::info!("Starting Alpaca Stream Client");

    let config = ClientConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    if let Some(port) = config.metrics_port {
        init_metrics(SocketAddr::from(([0, 0, 0, 0], port)))
            .context("failed to start metrics exporter")?;
    }

    let mut connection = StreamConnection::new(
        WsConnector::new(config.frame_pool_size),
        config.feed.wire_format(),
    );

    connection.connect_endpoint(&config.stream_endpoint).await?;
    connection.authenticate(&config.credentials).await?;
    let confirmation = connection.subscribe(&config.subscription).await?;
    tracing::info!(
        trades = ?confirmation.trades,
        quotes = ?confirmation.quotes,
        bars = ?confirmation.bars,
        "Streaming"
    );

    let (reader, coordinator) = connection.into_reader();
    let decoder = PayloadDecoder::for_feed(config.feed);
    let reader_task = tokio::spawn(stream_messages(reader, decoder));

    shutdown(coordinator, reader_task).await?;

    tracing::info!("Alpaca Stream Client stopped");
    Ok(())
}

/// Read until end of stream, logging each decoded message.
async fn stream_messages(mut reader: StreamReader<WsConnector>, decoder: PayloadDecoder) {
    loop {
        match reader.read_message().await {
            Ok(Some(payload)) => match decoder.decode(&payload) {
                Ok(messages) => {
                    for message in messages {
                        tracing::info!(
                            kind = message.kind(),
                            symbol = message.symbol().unwrap_or("-"),
                            "{message:?}"
                        );
                    }
                }
                Err(e) => tracing::warn!(error = %e, bytes = payload.len(), "Undecodable payload"),
            },
            Ok(None) => {
                tracing::info!("Stream ended");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "Stream read failed");
                break;
            }
        }
    }
}

/// Wait for a signal or the reader to finish, then run both shutdown phases.
async fn shutdown(
    coordinator: ShutdownCoordinator<WsConnector>,
    mut reader_task: tokio::task::JoinHandle<()>,
) -> anyhow::Result<()> {
    let reader_done = tokio::select! {
        () = await_signal() => false,
        _ = &mut reader_task => true,
    };

    let closed = coordinator.close();
    if !reader_done {
        reader_task.await.context("reader task panicked")?;
    }
    coordinator.release(closed).await?;
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn await_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, initiating shutdown"),
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

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

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        environment = config.environment.as_str(),
        feed = config.feed.as_str(),
        channels = ?config.subscription.channels(),
        symbols = ?config.subscription.symbols(),
        metrics_port = ?config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(stream_url = %config.stream_endpoint, "Stream endpoint");
}
