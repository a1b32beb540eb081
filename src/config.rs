use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ipnet::Ipv4Net;

use crate::error::{Error, Result};

/// Fallback for the `host` label when neither the config nor `HOST` set it.
const DEFAULT_HOST_LABEL: &str = "localhost";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dhcpd_config: PathBuf,
    pub leases_file: PathBuf,
    pub pools_regex: PathBuf,
    pub lease_regex: PathBuf,
    pub listen_address: IpAddr,
    pub port: u16,
    pub poll_interval_seconds: u64,
    pub log_level: String,
    pub host: Option<String>,
    /// Display names keyed by canonical subnet (`192.168.1.0/24`).
    pub aliases: HashMap<String, String>,
    pub pool_label: PoolLabel,
    pub on_poll_error: FailurePolicy,
}

/// Which pool attribute becomes the `pool` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolLabel {
    #[default]
    Alias,
    Name,
}

/// What the poll loop does when a cycle fails to read its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop polling and terminate the process with the error.
    Exit,
    /// Log the error and try again at the next interval.
    #[default]
    Retry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dhcpd_config: PathBuf::from("/etc/dhcp/dhcpd.conf"),
            leases_file: PathBuf::from("/var/lib/dhcp/dhcpd.leases"),
            pools_regex: PathBuf::from("patterns/pools_regex"),
            lease_regex: PathBuf::from("patterns/lease_regex"),
            listen_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 9000,
            poll_interval_seconds: 30,
            log_level: "info".to_string(),
            host: None,
            aliases: HashMap::new(),
            pool_label: PoolLabel::default(),
            on_poll_error: FailurePolicy::default(),
        }
    }
}

impl Config {
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(Error::InvalidConfig(
                "poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(Error::InvalidConfig(
                "port must be greater than 0".to_string(),
            ));
        }

        for key in self.aliases.keys() {
            let canonical = key
                .parse::<Ipv4Net>()
                .ok()
                .filter(|subnet| subnet.trunc() == *subnet);
            if canonical.is_none_or(|subnet| subnet.to_string() != *key) {
                return Err(Error::InvalidConfig(format!(
                    "alias key {:?} is not a canonical IPv4 network such as 192.168.1.0/24",
                    key
                )));
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.port)
    }

    /// The `host` label value: config, then the `HOST` environment variable,
    /// then `localhost`.
    pub fn host_label(&self) -> String {
        self.host
            .clone()
            .filter(|host| !host.is_empty())
            .or_else(|| std::env::var("HOST").ok().filter(|host| !host.is_empty()))
            .unwrap_or_else(|| DEFAULT_HOST_LABEL.to_string())
    }
}
