//! Pattern-driven extraction of pools and leases from DHCP server files.
//!
//! No DHCP grammar is built in. Each file kind is matched against an
//! externally supplied regular expression, one record per match, and the
//! capture groups are mapped onto [`Pool`] and [`Lease`] fields. This keeps
//! non-standard `dhcpd.conf` dialects a configuration concern.
//!
//! # Capture groups
//!
//! | Kind   | Positional                                  | Named                               |
//! |--------|---------------------------------------------|-------------------------------------|
//! | Pools  | network, prefix, name, router (optional)    | `network`, `prefix`, `name`, `router` |
//! | Leases | ip, status... or four octets, status...     | `ip`, `state`                       |
//!
//! Named groups take precedence over positions. Any other named group in a
//! lease pattern is copied into [`Lease::optional`].
//!
//! Malformed records are skipped individually; a single bad match never
//! aborts the rest of the file.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;

use regex::{Captures, Regex, RegexBuilder};
use tracing::debug;

use crate::error::{Error, Result};
use crate::lease::{Lease, LeaseState};
use crate::pool::{Pool, parse_subnet};

/// Named groups a lease pattern uses for its own fields.
const RESERVED_LEASE_GROUPS: [&str; 2] = ["ip", "state"];

/// Which file a [`Pattern`] is meant to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Pools,
    Leases,
}

impl PatternKind {
    /// Minimum number of capture groups needed to build a record.
    pub fn min_groups(&self) -> usize {
        match self {
            PatternKind::Pools => 3,
            PatternKind::Leases => 2,
        }
    }
}

/// A compiled, multi-line record pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    /// Compiles `source` with `^`/`$` matching at line boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Regex`] if the pattern does not compile and
    /// [`Error::InvalidPattern`] if it has fewer capture groups than `kind`
    /// needs.
    pub fn new(source: &str, kind: PatternKind) -> Result<Self> {
        let regex = RegexBuilder::new(source).multi_line(true).build()?;

        let groups = regex.captures_len() - 1;
        if groups < kind.min_groups() {
            return Err(Error::InvalidPattern(format!(
                "{:?} pattern needs at least {} capture groups, found {}",
                kind,
                kind.min_groups(),
                groups
            )));
        }

        let names = regex
            .capture_names()
            .flatten()
            .map(String::from)
            .collect();

        Ok(Self { regex, names })
    }

    /// Reads a pattern from a plain-text file, ignoring surrounding whitespace.
    pub async fn from_file<P: AsRef<Path>>(path: P, kind: PatternKind) -> Result<Self> {
        let source = read_text(path.as_ref()).await?;
        Self::new(source.trim(), kind)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    fn has_group(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }

    /// Returns the named group if the pattern declares it, otherwise the
    /// positional one. Groups that did not participate yield `""`.
    fn field<'t>(&self, captures: &Captures<'t>, name: &str, index: usize) -> &'t str {
        let found = if self.has_group(name) {
            captures.name(name)
        } else {
            captures.get(index)
        };
        found.map_or("", |m| m.as_str())
    }
}

/// Extracts pools from configuration text.
///
/// A pool's alias is looked up in `aliases` by the subnet's canonical form
/// (`192.168.1.0/24`) and falls back to the pool name.
pub fn parse_configuration(
    text: &str,
    pattern: &Pattern,
    aliases: &HashMap<String, String>,
) -> Vec<Pool> {
    let mut pools = Vec::new();

    for captures in pattern.regex.captures_iter(text) {
        let network = pattern.field(&captures, "network", 1);
        let prefix = pattern.field(&captures, "prefix", 2);

        let Some(subnet) = parse_subnet(network, prefix) else {
            debug!(
                "Skipping pool record with invalid subnet {:?}/{:?}",
                network, prefix
            );
            continue;
        };

        let name = pattern.field(&captures, "name", 3).trim();
        let router = pattern.field(&captures, "router", 4).trim();

        let mut pool = Pool::new(name, subnet, router);
        if let Some(alias) = aliases.get(&pool.canonical_subnet()) {
            pool.alias = alias.clone();
        }
        pools.push(pool);
    }

    pools
}

/// Extracts leases from lease-file text.
///
/// Records whose address does not parse or whose state is neither `active`
/// nor `backup` are skipped.
pub fn parse_leases(text: &str, pattern: &Pattern) -> Vec<Lease> {
    let mut leases = Vec::new();

    for captures in pattern.regex.captures_iter(text) {
        match lease_from_captures(pattern, &captures) {
            Some(lease) => leases.push(lease),
            None => debug!(
                "Skipping lease record without usable address or state: {:?}",
                captures.get(0).map_or("", |m| m.as_str())
            ),
        }
    }

    leases
}

fn lease_from_captures(pattern: &Pattern, captures: &Captures<'_>) -> Option<Lease> {
    let values: Vec<&str> = captures
        .iter()
        .skip(1)
        .map(|group| group.map_or("", |m| m.as_str()))
        .collect();

    let (ip, tokens): (Ipv4Addr, Vec<&str>) = if pattern.has_group("ip") {
        let ip = captures.name("ip")?.as_str().trim().parse::<Ipv4Addr>().ok()?;
        let tokens = if pattern.has_group("state") {
            captures.name("state").map(|m| m.as_str()).into_iter().collect()
        } else {
            values
        };
        (ip, tokens)
    } else if let Ok(ip) = values.first()?.trim().parse::<Ipv4Addr>() {
        (ip, values[1..].to_vec())
    } else {
        let octets = values
            .get(..4)?
            .iter()
            .map(|octet| octet.trim().parse::<u8>())
            .collect::<std::result::Result<Vec<u8>, _>>()
            .ok()?;
        (
            Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
            values[4..].to_vec(),
        )
    };

    let state = LeaseState::from_tokens(tokens)?;
    let mut lease = Lease::new(ip, state);

    for name in &pattern.names {
        if RESERVED_LEASE_GROUPS.contains(&name.as_str()) {
            continue;
        }
        if let Some(value) = captures.name(name) {
            lease = lease.with_attribute(name.as_str(), value.as_str());
        }
    }

    Some(lease)
}

/// Reads and parses the DHCP configuration file at `path`.
///
/// # Errors
///
/// Returns [`Error::ReadFile`] if the file is missing or unreadable.
pub async fn read_configuration<P: AsRef<Path>>(
    path: P,
    pattern: &Pattern,
    aliases: &HashMap<String, String>,
) -> Result<Vec<Pool>> {
    let text = read_text(path.as_ref()).await?;
    Ok(parse_configuration(&text, pattern, aliases))
}

/// Reads and parses the lease file at `path`.
///
/// # Errors
///
/// Returns [`Error::ReadFile`] if the file is missing or unreadable.
pub async fn read_leases<P: AsRef<Path>>(path: P, pattern: &Pattern) -> Result<Vec<Lease>> {
    let text = read_text(path.as_ref()).await?;
    Ok(parse_leases(&text, pattern))
}

/// Lease files may carry client-supplied hostnames in any encoding, so
/// invalid UTF-8 is replaced rather than rejected.
async fn read_text(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITIONAL_POOLS: &str = r"^# pool (\S+) (\S+) (\S+)(?: (\S+))?$";

    fn pools_pattern(source: &str) -> Pattern {
        Pattern::new(source, PatternKind::Pools).unwrap()
    }

    fn leases_pattern(source: &str) -> Pattern {
        Pattern::new(source, PatternKind::Leases).unwrap()
    }

    struct TestGuard(String);
    impl Drop for TestGuard {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn temp_file(name: &str, content: &str) -> TestGuard {
        let path = std::env::temp_dir()
            .join(format!("dhcpd_pools_parser_{}_{}", std::process::id(), name))
            .to_string_lossy()
            .into_owned();
        std::fs::write(&path, content).unwrap();
        TestGuard(path)
    }

    #[test]
    fn test_pattern_requires_capture_groups() {
        let result = Pattern::new(r"^subnet .*$", PatternKind::Pools);
        assert!(matches!(result, Err(Error::InvalidPattern(_))));

        let result = Pattern::new(r"^lease (\S+)$", PatternKind::Leases);
        assert!(matches!(result, Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_pattern_rejects_bad_syntax() {
        let result = Pattern::new(r"(unclosed", PatternKind::Leases);
        assert!(matches!(result, Err(Error::Regex(_))));
    }

    #[test]
    fn test_parse_positional_pools() {
        let text = "# pool 192.168.1.0 24 lab 192.168.1.1\n\
                    # pool 10.0.0.0 255.255.255.0 office\n";
        let pools = parse_configuration(text, &pools_pattern(POSITIONAL_POOLS), &HashMap::new());

        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].name, "lab");
        assert_eq!(pools[0].subnet.to_string(), "192.168.1.0/24");
        assert_eq!(pools[0].router, "192.168.1.1");
        assert_eq!(pools[0].alias, "lab");
        assert_eq!(pools[1].name, "office");
        assert_eq!(pools[1].subnet.to_string(), "10.0.0.0/24");
        assert_eq!(pools[1].router, "");
    }

    #[test]
    fn test_invalid_subnet_is_skipped_and_parsing_continues() {
        let text = "# pool 192.168.1.0 24 first\n\
                    # pool 192.168.2.9 24 host-bits\n\
                    # pool 300.1.1.0 24 bad-address\n\
                    # pool 192.168.3.0 40 bad-prefix\n\
                    # pool 192.168.4.0 24 last\n";
        let pools = parse_configuration(text, &pools_pattern(POSITIONAL_POOLS), &HashMap::new());

        let names: Vec<_> = pools.iter().map(|pool| pool.name.as_str()).collect();
        assert_eq!(names, vec!["first", "last"]);
    }

    #[test]
    fn test_alias_resolution() {
        let text = "# pool 192.168.1.0 24 lab 192.168.1.1\n\
                    # pool 192.168.2.0 24 guest 192.168.2.1\n";
        let aliases = HashMap::from([("192.168.1.0/24".to_string(), "lab-alias".to_string())]);
        let pools = parse_configuration(text, &pools_pattern(POSITIONAL_POOLS), &aliases);

        assert_eq!(pools[0].alias, "lab-alias");
        assert_eq!(pools[0].name, "lab");
        assert_eq!(pools[1].alias, "guest");
    }

    #[test]
    fn test_named_pool_groups_take_precedence() {
        let text = "shared-network lab {\n\
                    \x20 subnet 192.168.1.0 netmask 255.255.255.0 {\n\
                    \x20   option routers 192.168.1.1;\n\
                    \x20 }\n\
                    }\n";
        let pattern = pools_pattern(
            r"^shared-network (?P<name>\S+) \{\s*subnet (?P<network>[\d.]+) netmask (?P<prefix>[\d.]+) \{\s*option routers (?P<router>[\d.]+);",
        );
        let pools = parse_configuration(text, &pattern, &HashMap::new());

        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name, "lab");
        assert_eq!(pools[0].subnet.to_string(), "192.168.1.0/24");
        assert_eq!(pools[0].router, "192.168.1.1");
    }

    #[test]
    fn test_no_matches_yields_empty_list() {
        let pools = parse_configuration(
            "nothing to see here\n",
            &pools_pattern(POSITIONAL_POOLS),
            &HashMap::new(),
        );
        assert!(pools.is_empty());

        let leases = parse_leases("", &leases_pattern(r"^lease (\S+) (\S+)$"));
        assert!(leases.is_empty());
    }

    #[test]
    fn test_parse_dotted_leases() {
        let text = "lease 192.168.1.10 active\n\
                    lease 192.168.1.11 backup\n\
                    lease 192.168.1.12 free\n\
                    lease 192.168.1.300 active\n";
        let leases = parse_leases(text, &leases_pattern(r"^lease (\S+) (\S+)$"));

        assert_eq!(leases.len(), 2);
        assert_eq!(leases[0].ip, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(leases[0].state, LeaseState::Active);
        assert_eq!(leases[1].ip, Ipv4Addr::new(192, 168, 1, 11));
        assert_eq!(leases[1].state, LeaseState::Backup);
    }

    #[test]
    fn test_parse_octet_leases() {
        let text = "lease 10.0.0.5 {\n  binding state active;\n}\n\
                    lease 10.0.0.6 {\n  binding state free;\n}\n\
                    lease 10.0.0.7 {\n  binding state backup;\n}\n";
        let pattern =
            leases_pattern(r"^lease (\d+)\.(\d+)\.(\d+)\.(\d+) \{\s*binding state (\w+);");
        let leases = parse_leases(text, &pattern);

        assert_eq!(leases.len(), 2);
        assert_eq!(leases[0].ip, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(leases[0].state, LeaseState::Active);
        assert_eq!(leases[1].ip, Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(leases[1].state, LeaseState::Backup);
    }

    #[test]
    fn test_named_lease_groups_fill_optional() {
        let text = "lease 10.0.0.5 {\n\
                    \x20 binding state active;\n\
                    \x20 hardware ethernet aa:bb:cc:dd:ee:ff;\n\
                    }\n";
        let pattern = leases_pattern(
            r"^lease (?P<ip>[\d.]+) \{\s*binding state (?P<state>\w+);\s*hardware ethernet (?P<mac>[0-9a-f:]+);",
        );
        let leases = parse_leases(text, &pattern);

        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].ip, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(leases[0].state, LeaseState::Active);
        assert_eq!(leases[0].optional.len(), 1);
        assert_eq!(
            leases[0].optional.get("mac").map(String::as_str),
            Some("aa:bb:cc:dd:ee:ff")
        );
    }

    #[test]
    fn test_lease_state_taken_from_any_status_group() {
        let text = "lease 10.0.0.5 free active\n";
        let leases = parse_leases(text, &leases_pattern(r"^lease (\S+) (\S+) (\S+)$"));
        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].state, LeaseState::Active);
    }

    #[test]
    fn test_superseded_active_record_is_still_counted() {
        let text = "lease 192.168.1.10 active\n\
                    lease 192.168.1.10 free\n";
        let leases = parse_leases(text, &leases_pattern(r"^lease (\S+) (\S+)$"));

        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].ip, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(leases[0].state, LeaseState::Active);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_an_error() {
        let pattern = leases_pattern(r"^lease (\S+) (\S+)$");
        let result = read_leases("/nonexistent/dhcpd.leases", &pattern).await;
        match result {
            Err(Error::ReadFile { path, .. }) => {
                assert_eq!(path.as_path(), Path::new("/nonexistent/dhcpd.leases"));
            }
            other => panic!("expected ReadFile error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_configuration_from_file() {
        let guard = temp_file("conf", "# pool 192.168.1.0 24 lab 192.168.1.1\n");
        let pools = read_configuration(&guard.0, &pools_pattern(POSITIONAL_POOLS), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name, "lab");
    }

    #[tokio::test]
    async fn test_pattern_from_file_is_trimmed() {
        let guard = temp_file("lease_regex", "  ^lease (\\S+) (\\S+)$\n\n");
        let pattern = Pattern::from_file(&guard.0, PatternKind::Leases)
            .await
            .unwrap();
        assert_eq!(pattern.as_str(), r"^lease (\S+) (\S+)$");
    }
}
