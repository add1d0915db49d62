use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

mod config;
mod locations;
mod scheduler;
mod session;
mod snapshot;
mod transport;

use session::{Event, Session, Snapshot};
use transport::TelnetConnector;

// Ticks and link traffic share this queue; a reply is a handful of events at most.
const EVENT_QUEUE_DEPTH: usize = 1024;

const DEFAULT_LOG_FILTER: &str = "info,midgaard_bridge=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    log_builder(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    )
    .init();

    let cfg = Arc::new(config::parse_args());

    // The only fatal error: nothing to serve without a listener.
    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind http {}", cfg.bind))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
        info!("shutdown signal received");
    });

    let (events_tx, events_rx) = mpsc::channel::<Event>(EVENT_QUEUE_DEPTH);
    let (snap_tx, snap_rx) = watch::channel(Arc::new(Snapshot::default()));

    let session = Session::new(
        cfg.connect_command.clone(),
        TelnetConnector::new(cfg.host.clone(), cfg.batch_window),
        events_tx.clone(),
        snap_tx,
    );
    let session_task = tokio::spawn(session.run(events_rx, shutdown_rx.clone()));
    let scheduler_task = tokio::spawn(scheduler::run(
        cfg.poll_interval,
        events_tx,
        shutdown_rx.clone(),
    ));

    info!(
        bind = %cfg.bind,
        host = %cfg.host,
        poll_secs = cfg.poll_interval.as_secs(),
        batch_ms = cfg.batch_window.as_millis() as u64,
        "midgaard bridge listening"
    );

    axum::serve(listener, snapshot::router(snap_rx))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .await
        .context("serve http")?;

    let _ = scheduler_task.await;
    let _ = session_task.await;
    Ok(())
}

/// The level comes from `filter` alone; `RUST_LOG` wins over the default.
fn log_builder(filter: EnvFilter) -> SubscriberBuilder<DefaultFields, Format, EnvFilter> {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
}

pub(crate) async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
