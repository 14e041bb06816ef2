#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Result;
use clap::Parser;
use log_distributor::analyzer;

#[derive(Parser)]
#[command(name = "analyzer", about = "Admission-gated log analyzer")]
struct Cli {
    /// Listen address for the Analyze RPC
    #[arg(short, long, default_value = "0.0.0.0:50051")]
    listen: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(analyzer::bootstrap::run(analyzer::bootstrap::BootstrapArgs {
        listen: cli.listen,
    }))
}
