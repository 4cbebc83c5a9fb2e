// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Armada captain — proxy fleet control plane
//
//  Owns the user/pool catalog and answers the data-plane workers'
//  auth, config-sync, and usage calls over a JSON REST API.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use armada_captain::server::{self, AppState};
use armada_core::CaptainConfig;
use armada_store::Catalog;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "armada-captain", version, about = "Armada captain — fleet control plane")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    let config = CaptainConfig::load(cli.config.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        "Armada captain starting"
    );

    let state = AppState {
        catalog: Catalog::new(),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(server::serve(config, state))
}
