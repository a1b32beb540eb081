//! Exporter self-metrics describing the poll loop's health.
//!
//! These live in the same registry as the pool utilisation family, so a
//! scrape shows both the data and how fresh it is.

use std::time::Duration;

use chrono::Utc;
use prometheus::{Gauge, IntCounter, IntGauge, Registry};

use crate::error::Result;

#[derive(Clone)]
pub struct ExporterMetrics {
    /// Poll cycles started.
    pub poll_cycles: IntCounter,
    /// Poll cycles that failed to read or parse their inputs.
    pub poll_failures: IntCounter,
    /// Wall time of the last successful cycle.
    pub poll_duration: Gauge,
    /// Unix time of the last successful cycle.
    pub last_success: IntGauge,
}

impl ExporterMetrics {
    /// Creates the metrics and registers them with `registry`.
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self {
            poll_cycles: IntCounter::new(
                "dhcpd_pools_poll_cycles_total",
                "count of configuration and lease file poll cycles started",
            )?,
            poll_failures: IntCounter::new(
                "dhcpd_pools_poll_failures_total",
                "count of poll cycles that failed to read their input files",
            )?,
            poll_duration: Gauge::new(
                "dhcpd_pools_poll_duration_seconds",
                "duration of the last successful poll cycle",
            )?,
            last_success: IntGauge::new(
                "dhcpd_pools_last_success_timestamp_seconds",
                "unix time of the last successful poll cycle",
            )?,
        };

        registry.register(Box::new(metrics.poll_cycles.clone()))?;
        registry.register(Box::new(metrics.poll_failures.clone()))?;
        registry.register(Box::new(metrics.poll_duration.clone()))?;
        registry.register(Box::new(metrics.last_success.clone()))?;

        Ok(metrics)
    }

    pub fn record_success(&self, elapsed: Duration) {
        self.poll_duration.set(elapsed.as_secs_f64());
        self.last_success.set(Utc::now().timestamp());
    }

    pub fn record_failure(&self) {
        self.poll_failures.inc();
    }
}
