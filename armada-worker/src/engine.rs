use crate::control::ControlHandle;
use crate::{http, socks};
use armada_core::WorkerConfig;
use monoio::net::TcpListener;
use std::sync::Arc;
use tracing::{error, info};

/// Spawn monoio engine threads — one per core (or the configured count).
///
/// Each thread runs an independent monoio runtime with its own HTTP and
/// SOCKS listeners (shared port via the listener's reuse options), an
/// event loop, and nothing but the cloneable `ControlHandle` in common
/// with its siblings.
pub fn spawn_engines(
    handle: ControlHandle,
    config: Arc<WorkerConfig>,
) -> Vec<std::thread::JoinHandle<()>> {
    let num_workers = config.effective_workers();
    let mut handles = Vec::with_capacity(num_workers);

    for worker_id in 0..num_workers {
        let handle = handle.clone();
        let config = Arc::clone(&config);

        let thread = std::thread::Builder::new()
            .name(format!("armada-worker-{}", worker_id))
            .spawn(move || {
                let mut rt = monoio::RuntimeBuilder::<monoio::FusionDriver>::new()
                    .enable_all()
                    .build()
                    .expect("Failed to build monoio runtime");

                rt.block_on(engine_loop(worker_id, handle, config));
            })
            .expect("Failed to spawn engine thread");

        handles.push(thread);
    }

    info!(workers = num_workers, "Proxy engines spawned");
    handles
}

/// Main loop for a single engine thread: both accept loops run as tasks
/// on this thread's runtime.
async fn engine_loop(worker_id: usize, handle: ControlHandle, config: Arc<WorkerConfig>) {
    let http_loop = monoio::spawn(accept_http(worker_id, handle.clone(), Arc::clone(&config)));
    let socks_loop = monoio::spawn(accept_socks(worker_id, handle, config));
    http_loop.await;
    socks_loop.await;
}

async fn accept_http(worker_id: usize, handle: ControlHandle, config: Arc<WorkerConfig>) {
    let addr = config.http_addr;
    let listener = TcpListener::bind(addr).unwrap_or_else(|e| {
        panic!("Engine {} failed to bind HTTP proxy to {}: {}", worker_id, addr, e);
    });
    info!(worker = worker_id, addr = %addr, "HTTP proxy listening");

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                // TCP_NODELAY — disable Nagle's for lowest latency
                let _ = stream.set_nodelay(true);

                let handle = handle.clone();
                let config = Arc::clone(&config);
                monoio::spawn(async move {
                    if let Err(e) = http::handle_connection(stream, handle, config).await {
                        tracing::debug!(peer = %peer_addr, error = %e, "HTTP connection closed");
                    }
                });
            }
            Err(e) => {
                error!(worker = worker_id, error = %e, "HTTP accept error");
            }
        }
    }
}

async fn accept_socks(worker_id: usize, handle: ControlHandle, config: Arc<WorkerConfig>) {
    let addr = config.socks_addr;
    let listener = TcpListener::bind(addr).unwrap_or_else(|e| {
        panic!("Engine {} failed to bind SOCKS5 to {}: {}", worker_id, addr, e);
    });
    info!(worker = worker_id, addr = %addr, "SOCKS5 listening");

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let _ = stream.set_nodelay(true);

                let handle = handle.clone();
                let config = Arc::clone(&config);
                monoio::spawn(async move {
                    if let Err(e) = socks::handle_connection(stream, handle, config).await {
                        tracing::debug!(peer = %peer_addr, error = %e, "SOCKS connection closed");
                    }
                });
            }
            Err(e) => {
                error!(worker = worker_id, error = %e, "SOCKS accept error");
            }
        }
    }
}
