use crate::session::SessionTable;
use arc_swap::ArcSwap;
use armada_core::user::{AuthRequest, AuthResponse, UsageReport};
use armada_core::{Pool, WorkerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Failure modes of a data-plane credential check. The engines must
/// tell "captain unreachable" apart from "credentials rejected".
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("captain unreachable: {0}")]
    Transport(String),

    #[error("credentials rejected: {0}")]
    InvalidCredentials(String),
}

struct AuthJob {
    username: String,
    password: String,
    reply: oneshot::Sender<Result<AuthResponse, AuthFailure>>,
}

/// Cheap per-connection handle into the control-plane thread.
///
/// The proxy engines run on monoio; all captain I/O runs on one
/// dedicated tokio thread. The two meet through runtime-agnostic
/// `tokio::sync` channels plus an atomically swapped pool snapshot.
#[derive(Clone)]
pub struct ControlHandle {
    auth_tx: mpsc::UnboundedSender<AuthJob>,
    usage_tx: mpsc::UnboundedSender<UsageReport>,
    pools: Arc<ArcSwap<HashMap<String, Pool>>>,
    sessions: Arc<SessionTable>,
}

impl ControlHandle {
    /// Check a username/password pair against the captain.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthFailure> {
        let (reply, rx) = oneshot::channel();
        self.auth_tx
            .send(AuthJob {
                username: username.to_string(),
                password: password.to_string(),
                reply,
            })
            .map_err(|_| AuthFailure::Transport("control plane stopped".into()))?;
        rx.await
            .map_err(|_| AuthFailure::Transport("auth task dropped".into()))?
    }

    /// Fire-and-forget byte accounting. Never blocks the caller.
    pub fn report_usage(&self, user_id: &str, bytes: u64) {
        if user_id.is_empty() || bytes == 0 {
            return;
        }
        let report = UsageReport {
            user_id: user_id.to_string(),
            bytes: bytes as i64,
        };
        if self.usage_tx.send(report).is_err() {
            warn!("Usage channel closed; report dropped");
        }
    }

    /// Look up one pool in the current snapshot.
    pub fn pool(&self, name: &str) -> Option<Pool> {
        self.pools.load().get(name).cloned()
    }

    /// Defensive copy of the whole snapshot.
    pub fn pools(&self) -> HashMap<String, Pool> {
        let snapshot = self.pools.load();
        (**snapshot).clone()
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }
}

/// The worker's control plane: pool-catalog sync, auth service, usage
/// reporter, and session sweeper, all on one tokio thread.
pub struct ControlPlane;

impl ControlPlane {
    /// Spawn the control thread. Blocks until the initial catalog fetch
    /// has been attempted — the engines must not accept traffic before
    /// the first snapshot is in place (an empty one if the captain was
    /// unreachable).
    pub fn start(config: Arc<WorkerConfig>) -> anyhow::Result<ControlHandle> {
        let (auth_tx, auth_rx) = mpsc::unbounded_channel();
        let (usage_tx, usage_rx) = mpsc::unbounded_channel();
        let pools: Arc<ArcSwap<HashMap<String, Pool>>> =
            Arc::new(ArcSwap::from_pointee(HashMap::new()));
        let sessions = Arc::new(SessionTable::new());

        let handle = ControlHandle {
            auth_tx,
            usage_tx,
            pools: Arc::clone(&pools),
            sessions: Arc::clone(&sessions),
        };

        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        std::thread::Builder::new()
            .name("armada-control".to_string())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("Failed to build tokio runtime for control plane");
                rt.block_on(control_loop(
                    config, pools, sessions, auth_rx, usage_rx, ready_tx,
                ));
            })?;

        let _ = ready_rx.recv();
        Ok(handle)
    }
}

async fn control_loop(
    config: Arc<WorkerConfig>,
    pools: Arc<ArcSwap<HashMap<String, Pool>>>,
    sessions: Arc<SessionTable>,
    mut auth_rx: mpsc::UnboundedReceiver<AuthJob>,
    mut usage_rx: mpsc::UnboundedReceiver<UsageReport>,
    ready_tx: std::sync::mpsc::Sender<()>,
) {
    let base_url = config.captain_url.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();
    let auth_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.auth_timeout_ms))
        .build()
        .unwrap();

    // ── Initial snapshot, before the engines accept traffic ──
    match fetch_pools(&client, &base_url).await {
        Ok(map) => {
            info!(pools = map.len(), "Initial pool catalog loaded");
            pools.store(Arc::new(map));
        }
        Err(e) => {
            warn!(error = %e, "Initial config fetch failed; starting with an empty catalog");
        }
    }
    let _ = ready_tx.send(());

    // ── Config sync tick ──
    {
        let pools = Arc::clone(&pools);
        let client = client.clone();
        let base_url = base_url.clone();
        let period = Duration::from_secs(config.sync_interval_secs);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.tick().await; // the immediate first tick; initial fetch already ran
            loop {
                tick.tick().await;
                match fetch_pools(&client, &base_url).await {
                    Ok(map) => {
                        debug!(pools = map.len(), "Pool snapshot replaced");
                        pools.store(Arc::new(map));
                    }
                    Err(e) => {
                        warn!(error = %e, "Config sync failed; keeping previous snapshot");
                    }
                }
            }
        });
    }

    // ── Session sweeper ──
    {
        let ttl = Duration::from_secs(config.session_ttl_secs);
        let max_entries = config.session_max_entries;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(60));
            tick.tick().await;
            loop {
                tick.tick().await;
                let evicted = sessions.sweep(ttl, max_entries);
                if evicted > 0 {
                    debug!(evicted, remaining = sessions.len(), "Session table swept");
                }
            }
        });
    }

    // ── Usage reporter ──
    {
        let client = client.clone();
        let url = format!("{base_url}/api/v1/usage");
        tokio::spawn(async move {
            while let Some(report) = usage_rx.recv().await {
                let client = client.clone();
                let url = url.clone();
                tokio::spawn(async move {
                    match client.post(&url).json(&report).send().await {
                        Ok(resp) if !resp.status().is_success() => {
                            warn!(status = %resp.status(), user_id = %report.user_id, "Usage report rejected");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Failed to report usage"),
                    }
                });
            }
        });
    }

    // ── Auth service: drains jobs for the life of the worker ──
    let auth_url = format!("{base_url}/api/v1/auth");
    while let Some(job) = auth_rx.recv().await {
        let client = auth_client.clone();
        let url = auth_url.clone();
        tokio::spawn(async move {
            let result = authenticate(&client, &url, &job.username, &job.password).await;
            let _ = job.reply.send(result);
        });
    }
}

async fn fetch_pools(
    client: &reqwest::Client,
    base_url: &str,
) -> anyhow::Result<HashMap<String, Pool>> {
    let resp = client
        .get(format!("{base_url}/api/v1/config"))
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json().await?)
}

async fn authenticate(
    client: &reqwest::Client,
    url: &str,
    username: &str,
    password: &str,
) -> Result<AuthResponse, AuthFailure> {
    let request = AuthRequest {
        username: username.to_string(),
        password: password.to_string(),
    };
    let resp = client
        .post(url)
        .json(&request)
        .send()
        .await
        .map_err(|e| AuthFailure::Transport(e.to_string()))?;
    let auth: AuthResponse = resp
        .json()
        .await
        .map_err(|e| AuthFailure::Transport(e.to_string()))?;
    if auth.success {
        Ok(auth)
    } else {
        Err(AuthFailure::InvalidCredentials(auth.message))
    }
}
