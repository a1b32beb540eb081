//! Scrape-time rendering of pool utilisation.
//!
//! [`MetricsCollector`] is registered with a Prometheus [`Registry`] and is
//! invoked on every scrape. It takes whatever the poll loop last published
//! and turns it into `dhcpd_pools_util{host, pool, router}` samples. Until
//! the first poll cycle completes, the family has no samples.
//!
//! [`Registry`]: prometheus::Registry

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use tracing::{debug, error, warn};

use crate::channel::StatsChannel;
use crate::config::PoolLabel;
use crate::error::Result;

pub const POOL_UTILISATION_METRIC: &str = "dhcpd_pools_util";
const POOL_UTILISATION_HELP: &str = "DHCP server pools utilisation";
const POOL_UTILISATION_LABELS: [&str; 3] = ["host", "pool", "router"];

pub struct MetricsCollector {
    channel: Arc<StatsChannel>,
    host: String,
    pool_label: PoolLabel,
    desc: Desc,
}

impl MetricsCollector {
    pub fn new(channel: Arc<StatsChannel>, host: String, pool_label: PoolLabel) -> Result<Self> {
        let desc = Desc::new(
            POOL_UTILISATION_METRIC.to_string(),
            POOL_UTILISATION_HELP.to_string(),
            POOL_UTILISATION_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
            HashMap::new(),
        )?;

        Ok(Self {
            channel,
            host,
            pool_label,
            desc,
        })
    }
}

impl Collector for MetricsCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let Some(stats) = self.channel.try_consume() else {
            debug!("Scrape found no new pool stats");
            return Vec::new();
        };

        let gauge = match GaugeVec::new(
            Opts::new(POOL_UTILISATION_METRIC, POOL_UTILISATION_HELP),
            &POOL_UTILISATION_LABELS,
        ) {
            Ok(gauge) => gauge,
            Err(error) => {
                error!("Failed to build {} gauge: {}", POOL_UTILISATION_METRIC, error);
                return Vec::new();
            }
        };

        let mut pools: Vec<_> = stats
            .iter()
            .filter(|(_, pool)| pool.percentage.is_finite())
            .collect();
        // Unaliased pools claim their own name before aliased pools are placed.
        pools.sort_by(|(a_name, a), (b_name, b)| {
            let a_key = (a.alias != a_name.as_str(), a_name.as_str());
            let b_key = (b.alias != b_name.as_str(), b_name.as_str());
            a_key.cmp(&b_key)
        });

        let mut claimed = HashSet::new();
        let mut samples = 0;
        for (name, pool) in pools {
            let preferred = match self.pool_label {
                PoolLabel::Alias => pool.alias.as_str(),
                PoolLabel::Name => name.as_str(),
            };
            let label = claim_label(&mut claimed, preferred, name, &pool.router);
            if label != preferred {
                warn!(
                    "Pool {} label {:?} is already used on router {:?}, rendering it as {:?}",
                    name, preferred, pool.router, label
                );
            }
            gauge
                .with_label_values(&[self.host.as_str(), label.as_str(), pool.router.as_str()])
                .set(pool.percentage);
            samples += 1;
        }

        debug!("Rendered {} pool utilisation samples", samples);

        // The text encoder rejects families without samples.
        if samples == 0 {
            return Vec::new();
        }
        gauge.collect()
    }
}

/// Picks the first `pool` label not yet rendered for `router`: the preferred
/// label, then the pool name, then the name with a numeric suffix.
fn claim_label(
    claimed: &mut HashSet<(String, String)>,
    preferred: &str,
    name: &str,
    router: &str,
) -> String {
    [preferred.to_string(), name.to_string()]
        .into_iter()
        .chain((2u32..).map(|n| format!("{}-{}", name, n)))
        .find(|label| claimed.insert((label.clone(), router.to_string())))
        .unwrap_or_else(|| name.to_string())
}
