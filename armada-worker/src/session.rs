use dashmap::DashMap;
use std::time::{Duration, Instant};

struct SessionEntry {
    domain: String,
    last_used: Instant,
}

/// Sticky-session table: session id → the upstream domain it is pinned
/// to. Shared by every connection task on every engine thread; the
/// control thread sweeps it on a timer so idle entries cannot
/// accumulate without bound.
#[derive(Default)]
pub struct SessionTable {
    entries: DashMap<String, SessionEntry>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pinned domain for a session, refreshing its idle clock.
    pub fn get(&self, session_id: &str) -> Option<String> {
        if session_id.is_empty() {
            return None;
        }
        self.entries.get_mut(session_id).map(|mut entry| {
            entry.last_used = Instant::now();
            entry.domain.clone()
        })
    }

    /// Pin a session to a domain. Empty ids are never recorded.
    pub fn record(&self, session_id: &str, domain: &str) {
        if session_id.is_empty() {
            return;
        }
        self.entries.insert(
            session_id.to_string(),
            SessionEntry {
                domain: domain.to_string(),
                last_used: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries idle for `ttl` or longer, then trim oldest-first down
    /// to `max_entries`. Returns how many entries were evicted.
    pub fn sweep(&self, ttl: Duration, max_entries: usize) -> usize {
        let now = Instant::now();
        let before = self.entries.len();

        self.entries
            .retain(|_, entry| now.duration_since(entry.last_used) < ttl);

        let excess = self.entries.len().saturating_sub(max_entries);
        if excess > 0 {
            let mut by_age: Vec<(String, Instant)> = self
                .entries
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().last_used))
                .collect();
            by_age.sort_by_key(|(_, last_used)| *last_used);
            for (key, _) in by_age.into_iter().take(excess) {
                self.entries.remove(&key);
            }
        }

        before - self.entries.len()
    }
}
