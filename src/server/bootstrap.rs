use crate::config::DistributorConfig;
use crate::server;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub listen: String,
}

/// Distributor lifecycle: init → connect → watch weights → serve → shutdown.
pub async fn run(args: BootstrapArgs) -> Result<()> {
    init_tracing();

    let config = DistributorConfig::load_from_env()?;
    let state = server::DistributorState::new(config).await?;

    let shutdown = Arc::new(Notify::new());
    start_weight_watcher(&state, &shutdown);

    tracing::info!("server: starting distributor, listen={}", args.listen);

    let http_handle = tokio::spawn({
        let state = state.clone();
        let shutdown = shutdown.clone();
        let listen = args.listen.clone();
        async move { server::run_http_server(&listen, state, shutdown).await }
    });

    wait_for_shutdown(&shutdown).await;

    if let Err(e) = http_handle.await {
        tracing::error!("server: http task error: {}", e);
    }

    tracing::info!("server: shutdown complete");
    Ok(())
}

fn init_tracing() {
    let (non_blocking, _guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(_guard);
}

/// Sleep for `duration`, but return `true` immediately if shutdown is signalled.
async fn sleep_or_shutdown(duration: Duration, shutdown: &Notify) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.notified() => true,
    }
}

/// Polls `control.weights` on `weight_poll_secs` and swaps in the new
/// snapshot. A read failure logs and keeps the previous snapshot, per the
/// config-store error policy — it never aborts the loop.
fn start_weight_watcher(state: &server::DistributorState, shutdown: &Arc<Notify>) {
    let state = state.clone();
    let shutdown = shutdown.clone();
    let interval = state.config.weight_poll_interval;

    tokio::spawn(async move {
        loop {
            if sleep_or_shutdown(interval, &shutdown).await {
                return;
            }

            match state.store.fetch_weights().await {
                Ok(Some(values)) => {
                    state.weights.store(Arc::new(values));
                    metrics::counter!("distributor_weight_reload_total", "result" => "success")
                        .increment(1);
                    tracing::debug!("config: weights reloaded");
                }
                Ok(None) => {
                    tracing::debug!("config: weights document absent, keeping previous snapshot");
                }
                Err(e) => {
                    metrics::counter!("distributor_weight_reload_total", "result" => "error")
                        .increment(1);
                    tracing::warn!("config: weight poll failed, keeping previous snapshot: {}", e);
                }
            }
        }
    });
}

async fn wait_for_shutdown(shutdown: &Arc<Notify>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("server: received SIGINT, shutting down"),
        _ = terminate => tracing::info!("server: received SIGTERM, shutting down"),
    }

    shutdown.notify_waiters();
}
