#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Result;
use clap::Parser;
use log_distributor::server;

#[derive(Parser)]
#[command(name = "distributor", about = "Weighted log-ingest distributor")]
struct Cli {
    /// Listen address for /ingest, /health, /metrics
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let worker_threads = server::runtime::get_container_cpu_limit();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    rt.block_on(server::bootstrap::run(server::bootstrap::BootstrapArgs {
        listen: cli.listen,
    }))
}
