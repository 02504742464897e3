use index::RunReport;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_runs: AtomicUsize,
    successful_runs: AtomicUsize,
    failed_runs: AtomicUsize,

    // Timing (in microseconds)
    total_run_time_us: AtomicU64,

    // Graph writes
    total_documents_indexed: AtomicUsize,
    total_vertices_created: AtomicUsize,
    total_edges_created: AtomicUsize,
    total_relations_skipped: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_runs: AtomicUsize::new(0),
            successful_runs: AtomicUsize::new(0),
            failed_runs: AtomicUsize::new(0),
            total_run_time_us: AtomicU64::new(0),
            total_documents_indexed: AtomicUsize::new(0),
            total_vertices_created: AtomicUsize::new(0),
            total_edges_created: AtomicUsize::new(0),
            total_relations_skipped: AtomicUsize::new(0),
        })
    }

    pub fn record_success(&self, duration: Duration, report: &RunReport) {
        self.record_run(duration);
        self.successful_runs.fetch_add(1, Ordering::Relaxed);
        self.total_documents_indexed.fetch_add(
            report.documents_received - report.documents_skipped,
            Ordering::Relaxed,
        );
        self.total_vertices_created.fetch_add(report.vertices_created, Ordering::Relaxed);
        self.total_edges_created.fetch_add(report.edges_created, Ordering::Relaxed);
        self.total_relations_skipped.fetch_add(report.relations_skipped, Ordering::Relaxed);
    }

    pub fn record_failure(&self, duration: Duration) {
        self.record_run(duration);
        self.failed_runs.fetch_add(1, Ordering::Relaxed);
    }

    fn record_run(&self, duration: Duration) {
        self.total_runs.fetch_add(1, Ordering::Relaxed);
        self.total_run_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let runs = self.total_runs.load(Ordering::Relaxed);
        let total_us = self.total_run_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            total_runs: runs,
            successful_runs: self.successful_runs.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
            avg_run_time_ms: if runs > 0 {
                total_us / runs as f64 / 1000.0 // Convert to ms
            } else {
                0.0
            },
            total_documents_indexed: self.total_documents_indexed.load(Ordering::Relaxed),
            total_vertices_created: self.total_vertices_created.load(Ordering::Relaxed),
            total_edges_created: self.total_edges_created.load(Ordering::Relaxed),
            total_relations_skipped: self.total_relations_skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub avg_run_time_ms: f64,
    pub total_documents_indexed: usize,
    pub total_vertices_created: usize,
    pub total_edges_created: usize,
    pub total_relations_skipped: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_are_tallied() {
        let metrics = Metrics::new();
        let report = RunReport {
            documents_received: 2,
            documents_skipped: 1,
            vertices_created: 3,
            edges_created: 1,
            ..RunReport::default()
        };

        metrics.record_success(Duration::from_millis(4), &report);
        metrics.record_failure(Duration::from_millis(2));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_runs, 2);
        assert_eq!(snapshot.successful_runs, 1);
        assert_eq!(snapshot.failed_runs, 1);
        assert_eq!(snapshot.total_documents_indexed, 1);
        assert_eq!(snapshot.total_vertices_created, 3);
        assert!((snapshot.avg_run_time_ms - 3.0).abs() < 1e-9);
    }
}
