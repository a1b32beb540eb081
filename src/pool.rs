//! Address pools declared in the DHCP server configuration.

use std::fmt;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

/// A configured address range whose utilisation is tracked.
///
/// Pools are only ever constructed around a valid network; a declaration
/// whose subnet does not parse never becomes a `Pool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    /// Pool identifier as declared in the configuration file.
    pub name: String,

    /// The pool's network.
    pub subnet: Ipv4Net,

    /// Gateway address (may be empty when the pattern has no router group).
    pub router: String,

    /// Display name. Equal to `name` unless an alias mapping overrides it.
    pub alias: String,
}

impl Pool {
    /// Creates a pool whose alias is its own name.
    pub fn new(name: impl Into<String>, subnet: Ipv4Net, router: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            subnet,
            router: router.into(),
        }
    }

    /// Canonical string form of the subnet (`192.168.1.0/24`), the key used
    /// by alias mappings.
    pub fn canonical_subnet(&self) -> String {
        self.subnet.to_string()
    }

    /// Number of usable host addresses in the subnet.
    ///
    /// Network and broadcast addresses are excluded, except for /31
    /// point-to-point links (RFC 3021) and /32 host routes where every
    /// member address is usable.
    pub fn usable_hosts(&self) -> u64 {
        match self.subnet.prefix_len() {
            32 => 1,
            31 => 2,
            prefix => (1u64 << (32 - prefix)) - 2,
        }
    }

    /// Returns true if `ip` is one of the subnet's usable host addresses.
    pub fn is_usable_host(&self, ip: Ipv4Addr) -> bool {
        if !self.subnet.contains(&ip) {
            return false;
        }
        if self.subnet.prefix_len() >= 31 {
            return true;
        }
        ip != self.subnet.network() && ip != self.subnet.broadcast()
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} addresses",
            self.name,
            self.subnet,
            self.usable_hosts()
        )
    }
}

/// Builds a network from a captured address and prefix.
///
/// The prefix may be a length (`24`) or a dotted netmask (`255.255.255.0`).
/// Returns `None` for anything that is not a valid network, including an
/// address with host bits set (`192.168.1.7/24`).
pub fn parse_subnet(network: &str, prefix: &str) -> Option<Ipv4Net> {
    let address: Ipv4Addr = network.trim().parse().ok()?;
    let prefix = prefix.trim();

    let prefix_len = match prefix.parse::<u8>() {
        Ok(length) => length,
        Err(_) => ipnet::ipv4_mask_to_prefix(prefix.parse().ok()?).ok()?,
    };

    let subnet = Ipv4Net::new(address, prefix_len).ok()?;
    (subnet.trunc() == subnet).then_some(subnet)
}
