// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Armada worker — proxy fleet data plane
//
//  Engines:      monoio thread-per-core, HTTP proxy + SOCKS5
//  Control link: auth / config sync / usage on a dedicated tokio thread
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use armada_core::WorkerConfig;
use armada_worker::control::ControlPlane;
use armada_worker::engine;
use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Global shutdown flag — checked by signal handler.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser, Debug)]
#[command(name = "armada-worker", version, about = "Armada worker — fleet data plane")]
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

    let config = Arc::new(WorkerConfig::load(cli.config.as_deref())?);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        captain = %config.captain_url,
        "Armada worker starting — monoio thread-per-core engines"
    );

    // ── Control plane: first catalog fetch happens before any accept ──
    let handle = ControlPlane::start(Arc::clone(&config))?;

    // ── Engines ──
    let engine_handles = engine::spawn_engines(handle, Arc::clone(&config));

    info!(
        http_addr = %config.http_addr,
        socks_addr = %config.socks_addr,
        "Armada worker is ready — serving traffic"
    );

    // ── Graceful shutdown: wait for SIGTERM/SIGINT ──
    setup_signal_handler();

    while !SHUTDOWN.load(Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    info!("Shutdown signal received, stopping...");

    // Engines run infinite accept loops; on process exit the OS reclaims
    // every socket. In-flight tunnels end when their peers notice the
    // close.
    drop(engine_handles);

    info!("Armada worker stopped");
    Ok(())
}

fn setup_signal_handler() {
    // SIGTERM (docker stop) + SIGINT (Ctrl+C)
    for sig in [libc::SIGTERM, libc::SIGINT] {
        unsafe {
            libc::signal(sig, signal_handler as libc::sighandler_t);
        }
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}
