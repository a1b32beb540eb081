//! Periodic re-parse and recompute driver.
//!
//! The poll loop alternates between two states for the lifetime of the
//! process:
//!
//! - [`PollState::Parsing`]: read both files, compute stats, publish them
//! - [`PollState::Idle`]: wait for the next interval tick
//!
//! Publishing goes through the shared [`StatsChannel`] and never waits for
//! a scrape.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::channel::StatsChannel;
use crate::config::{Config, FailurePolicy};
use crate::error::{Error, Result};
use crate::metrics::ExporterMetrics;
use crate::parser::{self, Pattern, PatternKind};
use crate::stats::{PoolStatsMap, compute_stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Parsing,
    Idle,
}

pub struct Poller {
    config: Arc<Config>,
    pools_pattern: Pattern,
    lease_pattern: Pattern,
    channel: Arc<StatsChannel>,
    metrics: ExporterMetrics,
}

impl Poller {
    pub fn new(
        config: Arc<Config>,
        pools_pattern: Pattern,
        lease_pattern: Pattern,
        channel: Arc<StatsChannel>,
        metrics: ExporterMetrics,
    ) -> Self {
        Self {
            config,
            pools_pattern,
            lease_pattern,
            channel,
            metrics,
        }
    }

    /// Creates a poller whose patterns are read from the files named in
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either pattern file is unreadable or the pattern
    /// is unusable. Patterns are loaded once, so this is a startup error.
    pub async fn from_config(
        config: Arc<Config>,
        channel: Arc<StatsChannel>,
        metrics: ExporterMetrics,
    ) -> Result<Self> {
        config.validate()?;
        let pools_pattern = Pattern::from_file(&config.pools_regex, PatternKind::Pools).await?;
        let lease_pattern = Pattern::from_file(&config.lease_regex, PatternKind::Leases).await?;
        Ok(Self::new(
            config,
            pools_pattern,
            lease_pattern,
            channel,
            metrics,
        ))
    }

    /// Runs the poll loop until a cycle fails under [`FailurePolicy::Exit`].
    ///
    /// The first cycle runs immediately. Under [`FailurePolicy::Retry`]
    /// this never returns.
    pub async fn run(&self) -> Result<()> {
        if self.config.poll_interval_seconds == 0 {
            return Err(Error::InvalidConfig(
                "poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Polling {} and {} every {}s",
            self.config.dhcpd_config.display(),
            self.config.leases_file.display(),
            self.config.poll_interval_seconds
        );

        let mut state = PollState::Idle;
        loop {
            state = match state {
                PollState::Idle => {
                    ticker.tick().await;
                    PollState::Parsing
                }
                PollState::Parsing => {
                    if let Err(error) = self.run_cycle().await {
                        match self.config.on_poll_error {
                            FailurePolicy::Exit => {
                                error!("Poll cycle failed, stopping: {}", error);
                                return Err(error);
                            }
                            FailurePolicy::Retry => {
                                error!(
                                    "Poll cycle failed, retrying in {}s: {}",
                                    self.config.poll_interval_seconds, error
                                );
                            }
                        }
                    }
                    PollState::Idle
                }
            };
        }
    }

    /// Runs one parse, compute, publish pass.
    ///
    /// Returns the number of pools published.
    pub async fn run_cycle(&self) -> Result<usize> {
        let started = Instant::now();
        self.metrics.poll_cycles.inc();

        let stats = match self.compute().await {
            Ok(stats) => stats,
            Err(error) => {
                self.metrics.record_failure();
                return Err(error);
            }
        };

        let pool_count = stats.len();
        if self.channel.publish(Arc::new(stats)) {
            debug!("Replaced pool stats that were never scraped");
        }

        let elapsed = started.elapsed();
        self.metrics.record_success(elapsed);

        info!(
            "Parsing completed: {} pools in {:.3}s, queue depth {}",
            pool_count,
            elapsed.as_secs_f64(),
            self.channel.depth()
        );

        Ok(pool_count)
    }

    /// Parses both files and computes stats without publishing them.
    pub async fn compute(&self) -> Result<PoolStatsMap> {
        debug!("Parsing {}", self.config.dhcpd_config.display());
        let pools = parser::read_configuration(
            &self.config.dhcpd_config,
            &self.pools_pattern,
            &self.config.aliases,
        )
        .await?;

        debug!("Parsing {}", self.config.leases_file.display());
        let leases = parser::read_leases(&self.config.leases_file, &self.lease_pattern).await?;

        if pools.is_empty() {
            warn!(
                "No pools matched in {}; check that the pools pattern fits its layout",
                self.config.dhcpd_config.display()
            );
        }

        debug!("Found {} pools and {} leases", pools.len(), leases.len());
        Ok(compute_stats(&pools, &leases))
    }
}
