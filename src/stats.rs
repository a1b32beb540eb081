//! Per-pool utilisation computation.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;

use serde::Serialize;
use tracing::warn;

use crate::lease::Lease;
use crate::pool::Pool;

/// Utilisation figures for a single pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStats {
    /// Usable host addresses in the pool's subnet.
    pub total: u64,
    /// Distinct leased addresses among those hosts.
    pub reserved: u64,
    /// `reserved * 100 / total`, or `0.0` for an empty pool.
    pub percentage: f64,
    pub router: String,
    pub alias: String,
}

/// Stats keyed by pool name.
pub type PoolStatsMap = HashMap<String, PoolStats>;

/// Computes utilisation for every pool against one snapshot of leases.
///
/// Lease addresses are deduplicated first, so a lease listed several times
/// (ISC dhcpd appends a new record on every renewal) counts once. Only
/// usable host addresses of a pool are counted: a lease on the network or
/// broadcast address, or outside every declared pool, inflates nothing.
///
/// Pool names are expected to be unique; if one repeats, the later
/// declaration replaces the earlier one.
pub fn compute_stats(pools: &[Pool], leases: &[Lease]) -> PoolStatsMap {
    let leased: HashSet<Ipv4Addr> = leases.iter().map(|lease| lease.ip).collect();

    let mut stats = PoolStatsMap::with_capacity(pools.len());
    for pool in pools {
        let total = pool.usable_hosts();
        let reserved = leased
            .iter()
            .filter(|ip| pool.is_usable_host(**ip))
            .count() as u64;

        let entry = PoolStats {
            total,
            reserved,
            percentage: percentage(reserved, total),
            router: pool.router.clone(),
            alias: pool.alias.clone(),
        };

        if stats.insert(pool.name.clone(), entry).is_some() {
            warn!(
                "Pool {} is declared more than once; keeping {}",
                pool.name, pool.subnet
            );
        }
    }

    stats
}

fn percentage(reserved: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    reserved as f64 * 100.0 / total as f64
}
