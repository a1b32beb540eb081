//! # dhcpd-pools-exporter
//!
//! A Prometheus exporter for ISC DHCP server pool utilisation.
//!
//! ## Features
//!
//! - Pattern-driven parsing of `dhcpd.conf` and `dhcpd.leases` (no hard-coded grammar)
//! - Per-pool utilisation over usable host addresses, with duplicate leases counted once
//! - Display aliases for pools keyed by subnet
//! - Background polling decoupled from scrapes through a single-slot channel
//! - Async/await with Tokio, HTTP with axum
//!
//! ## Quick Start
//!
//! ```no_run
//! use dhcpd_pools_exporter::{Config, ExporterServer};
//!
//! #[tokio::main]
//! async fn main() -> dhcpd_pools_exporter::Result<()> {
//!     let config = Config::load_or_create("dhcpd-pools-exporter.yaml")?;
//!     let server = ExporterServer::new(config).await?;
//!     server.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`parser`] - Extracts [`Pool`] and [`Lease`] records using configured patterns
//! - [`compute_stats`] - Turns pools and leases into [`PoolStats`]
//! - [`StatsChannel`] - Hands the freshest stats from the poller to scrapes
//! - [`Poller`] - Re-parses and publishes on a fixed interval
//! - [`MetricsCollector`] - Renders `dhcpd_pools_util` on each scrape
//! - [`ExporterServer`] - Wires everything to an HTTP `/metrics` endpoint

pub mod channel;
pub mod collector;
pub mod config;
pub mod error;
pub mod lease;
pub mod metrics;
pub mod parser;
pub mod poller;
pub mod pool;
pub mod server;
pub mod stats;

pub use channel::StatsChannel;
pub use collector::MetricsCollector;
pub use config::{Config, FailurePolicy, PoolLabel};
pub use error::{Error, Result};
pub use lease::{Lease, LeaseState};
pub use metrics::ExporterMetrics;
pub use parser::{Pattern, PatternKind};
pub use poller::{PollState, Poller};
pub use pool::Pool;
pub use server::ExporterServer;
pub use stats::{PoolStats, PoolStatsMap, compute_stats};
