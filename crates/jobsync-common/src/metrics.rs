//! OpenTelemetry metrics for image synchronization
//!
//! Instruments are created lazily on the global meter. Without an OTLP
//! endpoint the global meter is a no-op, so recording is always safe.

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

static METER: Lazy<Meter> = Lazy::new(|| global::meter("jobsync"));

/// Counter of reconciliation passes
///
/// Labels:
/// - `result`: synced, skipped, list_failed
pub static PASSES_TOTAL: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("jobsync_passes_total")
        .with_description("Total number of Deployment reconciliation passes")
        .with_unit("{passes}")
        .build()
});

/// Counter of per-CronJob update outcomes
///
/// Labels:
/// - `outcome`: updated, would_update, failed
pub static CRON_JOB_UPDATES_TOTAL: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("jobsync_cron_job_updates_total")
        .with_description("Total number of CronJob image updates by outcome")
        .with_unit("{updates}")
        .build()
});

/// Histogram of sync pass duration (list + updates)
///
/// Labels:
/// - `result`: completed, list_failed
pub static PASS_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("jobsync_pass_duration_seconds")
        .with_description("Duration of CronJob sync passes in seconds")
        .with_unit("s")
        .build()
});

/// Result label for a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassResult {
    /// The gate passed and the sync engine ran
    Synced,
    /// The gate dropped the event
    Skipped,
    /// Listing CronJobs failed
    ListFailed,
}

impl PassResult {
    /// Label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Skipped => "skipped",
            Self::ListFailed => "list_failed",
        }
    }
}

/// Record one reconciliation pass
pub fn record_pass(result: PassResult) {
    PASSES_TOTAL.add(1, &[KeyValue::new("result", result.as_str())]);
}

/// Record one CronJob update outcome (`updated`, `would_update`, `failed`)
pub fn record_update(outcome: &'static str) {
    CRON_JOB_UPDATES_TOTAL.add(1, &[KeyValue::new("outcome", outcome)]);
}

/// Times one sync pass, including passes that fail to list CronJobs
pub struct PassTimer {
    start: std::time::Instant,
}

impl PassTimer {
    /// Start timing a pass
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Record the pass as having listed CronJobs; returns the elapsed seconds
    pub fn completed(self) -> f64 {
        self.record("completed")
    }

    /// Record the pass as aborted by a failed list; returns the elapsed seconds
    pub fn list_failed(self) -> f64 {
        self.record(PassResult::ListFailed.as_str())
    }

    fn record(self, result: &'static str) -> f64 {
        let duration = self.start.elapsed().as_secs_f64();
        PASS_DURATION.record(duration, &[KeyValue::new("result", result)]);
        duration
    }
}
