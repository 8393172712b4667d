use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};

const LATENCY_BUCKET_COUNT: usize = 12;
const LATENCY_BUCKETS_MS: [u64; LATENCY_BUCKET_COUNT] =
    [1, 2, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

#[derive(Clone, Debug, Serialize)]
pub struct LatencySnapshot {
    pub buckets_ms: Vec<u64>,
    pub counts: Vec<u64>,
    pub overflow: u64,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: u64,
}

#[derive(Default)]
pub struct LatencyMetrics {
    buckets: [AtomicU64; LATENCY_BUCKET_COUNT],
    overflow: AtomicU64,
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyMetrics {
    pub fn record(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.update_max(ms);

        if let Some((idx, _)) = LATENCY_BUCKETS_MS
            .iter()
            .enumerate()
            .find(|(_, bucket)| ms <= **bucket)
        {
            self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        } else {
            self.overflow.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        let avg_ms = if count > 0 {
            total_ms as f64 / count as f64
        } else {
            0.0
        };
        let counts = self
            .buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect::<Vec<_>>();

        LatencySnapshot {
            buckets_ms: LATENCY_BUCKETS_MS.to_vec(),
            counts,
            overflow: self.overflow.load(Ordering::Relaxed),
            count,
            avg_ms,
            max_ms: self.max_ms.load(Ordering::Relaxed),
        }
    }

    fn update_max(&self, value: u64) {
        let mut current = self.max_ms.load(Ordering::Relaxed);
        while value > current {
            match self.max_ms.compare_exchange_weak(
                current,
                value,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(next) => current = next,
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HttpMetricsSnapshot {
    pub start_game: LatencySnapshot,
    pub flip: LatencySnapshot,
    pub query: LatencySnapshot,
    pub ledger: LatencySnapshot,
}

#[derive(Default)]
pub struct HttpMetrics {
    start_game: LatencyMetrics,
    flip: LatencyMetrics,
    query: LatencyMetrics,
    ledger: LatencyMetrics,
}

impl HttpMetrics {
    pub fn record_start_game(&self, duration: Duration) {
        self.start_game.record(duration);
    }

    pub fn record_flip(&self, duration: Duration) {
        self.flip.record(duration);
    }

    pub fn record_query(&self, duration: Duration) {
        self.query.record(duration);
    }

    pub fn record_ledger(&self, duration: Duration) {
        self.ledger.record(duration);
    }

    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            start_game: self.start_game.snapshot(),
            flip: self.flip.snapshot(),
            query: self.query.snapshot(),
            ledger: self.ledger.snapshot(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct SystemMetricsSnapshot {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub cpu_usage_percent: f64,
}

pub struct SystemMetrics {
    system: Mutex<System>,
    pid: Pid,
}

impl SystemMetrics {
    pub fn new() -> Self {
        let system = System::new();
        let pid = Pid::from_u32(std::process::id());
        Self {
            system: Mutex::new(system),
            pid,
        }
    }

    pub fn snapshot(&self) -> SystemMetricsSnapshot {
        let mut system = self.system.lock().unwrap();
        system.refresh_cpu_usage();
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), false);

        if let Some(process) = system.process(self.pid) {
            SystemMetricsSnapshot {
                rss_bytes: process.memory().saturating_mul(1024),
                virtual_bytes: process.virtual_memory().saturating_mul(1024),
                cpu_usage_percent: process.cpu_usage() as f64,
            }
        } else {
            SystemMetricsSnapshot {
                rss_bytes: 0,
                virtual_bytes: 0,
                cpu_usage_percent: 0.0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_buckets_accumulate() {
        let metrics = LatencyMetrics::default();
        metrics.record(Duration::from_millis(1));
        metrics.record(Duration::from_millis(40));
        metrics.record(Duration::from_millis(9_999));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.overflow, 1);
        assert_eq!(snapshot.max_ms, 9_999);
        assert_eq!(snapshot.counts.iter().sum::<u64>(), 2);
    }

    #[test]
    fn empty_snapshot_has_zero_average() {
        let snapshot = LatencyMetrics::default().snapshot();
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.avg_ms, 0.0);
    }
}
