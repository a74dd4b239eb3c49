use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;

use crate::models::TurnResponse;

pub type ResponseCell = Arc<OnceCell<TurnResponse>>;

struct Entry {
    cell: ResponseCell,
    claimed_at: Instant,
}

impl Entry {
    /// In-flight entries never expire.
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        !self.cell.initialized() || now.saturating_duration_since(self.claimed_at) < ttl
    }
}

/// Caller-token keyed response cache. A token is claimed before its turn
/// runs, so concurrent submissions share one execution. Responses are
/// immutable once written and expire after `ttl`; expired entries are swept
/// whenever the cache grows past `prune_threshold`.
pub struct IdempotencyCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    prune_threshold: usize,
}

impl IdempotencyCache {
    pub fn new(ttl: Duration, prune_threshold: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            prune_threshold,
        }
    }

    /// Runs `turn` unless `key` already has a live or in-flight response,
    /// in which case that response is awaited instead. The flag is true
    /// when this call produced the response.
    pub async fn get_or_run<F, Fut>(&self, key: &str, turn: F) -> (TurnResponse, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = TurnResponse>,
    {
        let cell = self.claim_at(key, Instant::now());
        let mut ran = false;
        let response = cell
            .get_or_init(|| {
                ran = true;
                turn()
            })
            .await
            .clone();
        (response, ran)
    }

    /// The cell for `key`, replacing an expired one. The check and the
    /// insert happen under one lock.
    pub fn claim_at(&self, key: &str, now: Instant) -> ResponseCell {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get(key) {
            if entry.is_live(now, self.ttl) {
                return entry.cell.clone();
            }
        }

        let cell = ResponseCell::default();
        entries.insert(
            key.to_string(),
            Entry {
                cell: cell.clone(),
                claimed_at: now,
            },
        );

        if entries.len() > self.prune_threshold {
            let before = entries.len();
            let ttl = self.ttl;
            entries.retain(|_, e| e.is_live(now, ttl));
            tracing::debug!(removed = before - entries.len(), "pruned idempotency cache");
        }

        cell
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
