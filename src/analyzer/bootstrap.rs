use crate::analyzer::service::AnalyzerService;
use crate::analyzer::sink::{GelfUdpSink, LogSink, TracingSink};
use crate::analyzer::AnalyzerState;
use crate::config::AnalyzerConfig;
use crate::config::store::ConfigStore;
use crate::proto::analyzer_server::AnalyzerServer;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub listen: String,
}

/// Analyzer lifecycle: init -> connect -> poll admission flag -> serve -> shutdown.
pub async fn run(args: BootstrapArgs) -> Result<()> {
    init_tracing();

    let config = AnalyzerConfig::load_from_env()?;
    // Installs the global recorder so `metrics::counter!` calls elsewhere in
    // this binary record somewhere; the analyzer exposes no /metrics route,
    // so the render handle itself is unused.
    let _ = crate::metrics::Metrics::install();

    let sink: Arc<dyn LogSink> = match &config.graylog_host {
        Some(host) => match GelfUdpSink::connect(host, config.graylog_port) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                tracing::warn!(error = %e, "gelf sink: connect failed, falling back to tracing sink");
                Arc::new(TracingSink)
            }
        },
        None => Arc::new(TracingSink),
    };

    let store = ConfigStore::connect(&config.mongo_uri).await?;
    let state = AnalyzerState::new(config, sink);

    let shutdown = Arc::new(Notify::new());
    state.gate.spawn_poll_loop(
        store,
        state.config.name.clone(),
        state.config.poll_interval,
        shutdown.clone(),
    );

    let addr = args.listen.parse()?;
    tracing::info!(analyzer = %state.config.name, %addr, "analyzer: starting admission gate");

    let service = AnalyzerServer::new(AnalyzerService::new(state));

    tonic::transport::Server::builder()
        .add_service(service)
        .serve_with_shutdown(addr, async move {
            wait_for_shutdown().await;
            shutdown.notify_waiters();
        })
        .await?;

    tracing::info!("analyzer: shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();
}

async fn wait_for_shutdown() {
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
        _ = ctrl_c => tracing::info!("analyzer: received SIGINT, shutting down"),
        _ = terminate => tracing::info!("analyzer: received SIGTERM, shutting down"),
    }
}
