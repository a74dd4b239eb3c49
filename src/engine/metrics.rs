use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::models::NextAction;

const CONSECUTIVE_FALLBACK_WARN: u64 = 3;
const SUMMARY_EVERY: u64 = 100;

/// In-process turn counters. Reset on restart.
#[derive(Debug, Default)]
pub struct TurnMetrics {
    total_turns: AtomicU64,
    assisted_calls: AtomicU64,
    deterministic_only: AtomicU64,
    fallbacks: AtomicU64,
    idempotency_hits: AtomicU64,
    ask_question: AtomicU64,
    confirm: AtomicU64,
    lookup: AtomicU64,
    complete: AtomicU64,
    consecutive_fallbacks: AtomicU64,
    max_consecutive_fallbacks: AtomicU64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub total_turns: u64,
    pub assisted_calls: u64,
    pub deterministic_only: u64,
    pub fallbacks: u64,
    pub idempotency_hits: u64,
    pub ask_question: u64,
    pub confirm: u64,
    pub lookup: u64,
    pub complete: u64,
    pub consecutive_fallbacks: u64,
    pub max_consecutive_fallbacks: u64,
}

impl TurnMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_turn(&self, assisted: bool, action: NextAction, fallback: bool) {
        let total = self.total_turns.fetch_add(1, Ordering::Relaxed) + 1;

        if assisted {
            self.assisted_calls.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deterministic_only.fetch_add(1, Ordering::Relaxed);
        }

        if fallback {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
            let run = self.consecutive_fallbacks.fetch_add(1, Ordering::Relaxed) + 1;
            let max = self
                .max_consecutive_fallbacks
                .fetch_max(run, Ordering::Relaxed)
                .max(run);
            if run >= CONSECUTIVE_FALLBACK_WARN {
                tracing::warn!(
                    consecutive_fallbacks = run,
                    max_seen = max,
                    "repeated fallback responses"
                );
            }
        } else {
            self.consecutive_fallbacks.store(0, Ordering::Relaxed);
        }

        let counter = match action {
            NextAction::AskQuestion => &self.ask_question,
            NextAction::Confirm => &self.confirm,
            NextAction::Lookup => &self.lookup,
            NextAction::Complete => &self.complete,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if total % SUMMARY_EVERY == 0 {
            self.log_summary();
        }
    }

    pub fn record_idempotency_hit(&self) {
        self.idempotency_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_turns: load(&self.total_turns),
            assisted_calls: load(&self.assisted_calls),
            deterministic_only: load(&self.deterministic_only),
            fallbacks: load(&self.fallbacks),
            idempotency_hits: load(&self.idempotency_hits),
            ask_question: load(&self.ask_question),
            confirm: load(&self.confirm),
            lookup: load(&self.lookup),
            complete: load(&self.complete),
            consecutive_fallbacks: load(&self.consecutive_fallbacks),
            max_consecutive_fallbacks: load(&self.max_consecutive_fallbacks),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        if s.total_turns == 0 {
            return;
        }
        let pct = |n: u64| n as f64 * 100.0 / s.total_turns as f64;
        tracing::info!(
            total = s.total_turns,
            assisted_rate = format!("{:.1}%", pct(s.assisted_calls)),
            fallback_rate = format!("{:.1}%", pct(s.fallbacks)),
            idempotency_hits = s.idempotency_hits,
            ask_question = s.ask_question,
            confirm = s.confirm,
            lookup = s.lookup,
            complete = s.complete,
            "turn metrics"
        );
    }
}
