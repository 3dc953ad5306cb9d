//! In-process dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use reflex_core::PipelineStatus;

/// Counters for events and pipeline terminal states.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    events_received: AtomicU64,
    events_matched: AtomicU64,
    events_unmatched: AtomicU64,
    pipelines_done: AtomicU64,
    pipelines_not_launched: AtomicU64,
    pipelines_error: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_matched: u64,
    pub events_unmatched: u64,
    pub pipelines_done: u64,
    pub pipelines_not_launched: u64,
    pub pipelines_error: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match(&self, matched: bool) {
        if matched {
            self.events_matched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.events_unmatched.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_pipeline(&self, status: PipelineStatus) {
        let counter = match status {
            PipelineStatus::Done => &self.pipelines_done,
            PipelineStatus::NotLaunched => &self.pipelines_not_launched,
            PipelineStatus::Error => &self.pipelines_error,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_matched: self.events_matched.load(Ordering::Relaxed),
            events_unmatched: self.events_unmatched.load(Ordering::Relaxed),
            pipelines_done: self.pipelines_done.load(Ordering::Relaxed),
            pipelines_not_launched: self.pipelines_not_launched.load(Ordering::Relaxed),
            pipelines_error: self.pipelines_error.load(Ordering::Relaxed),
        }
    }
}
