//! Lease records extracted from the DHCP server's lease file.
//!
//! Only the address and binding state matter for utilisation. Any other
//! attribute a lease pattern captures through named groups is kept in
//! [`Lease::optional`] untouched.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Binding state of a lease that counts as a reservation.
///
/// Free, expired, released, and abandoned bindings have no variant: records
/// in those states are dropped during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaseState {
    Active,
    Backup,
}

impl LeaseState {
    /// Determines the state from a record's status tokens.
    ///
    /// `active` takes precedence over `backup` when both appear, so a record
    /// whose current state is `active` and next state is `backup` is active.
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let mut state = None;
        for token in tokens {
            match token.parse() {
                Ok(LeaseState::Active) => return Some(LeaseState::Active),
                Ok(LeaseState::Backup) => state = Some(LeaseState::Backup),
                Err(()) => {}
            }
        }
        state
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseState::Active => "active",
            LeaseState::Backup => "backup",
        }
    }
}

impl FromStr for LeaseState {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim() {
            "active" => Ok(LeaseState::Active),
            "backup" => Ok(LeaseState::Backup),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LeaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single address assignment from the lease file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// The leased address.
    pub ip: Ipv4Addr,

    /// Binding state at the time the file was read.
    pub state: LeaseState,

    /// Auxiliary attributes from named capture groups (e.g. `mac`, `ends`).
    pub optional: HashMap<String, String>,
}

impl Lease {
    pub fn new(ip: Ipv4Addr, state: LeaseState) -> Self {
        Self {
            ip,
            state,
            optional: HashMap::new(),
        }
    }

    /// Adds an auxiliary attribute, replacing any previous value for `key`.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.optional.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ip: {}, state: {}", self.ip, self.state)?;
        if !self.optional.is_empty() {
            let mut keys: Vec<_> = self.optional.keys().collect();
            keys.sort();
            for key in keys {
                write!(f, ", {}: {}", key, self.optional[key])?;
            }
        }
        Ok(())
    }
}
