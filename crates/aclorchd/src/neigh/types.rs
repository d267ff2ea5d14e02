//! Next-hop keys and entries.

use std::fmt;
use std::str::FromStr;

use aclorch_sai::NextHopOid;
use aclorch_types::{IpAddress, MacAddress};

/// Identity of a next-hop: the adjacency address on an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NextHopKey {
    pub ip: IpAddress,
    pub interface: String,
}

impl NextHopKey {
    pub fn new(ip: IpAddress, interface: impl Into<String>) -> Self {
        Self {
            ip,
            interface: interface.into(),
        }
    }
}

impl fmt::Display for NextHopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ip, self.interface)
    }
}

impl FromStr for NextHopKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip, interface) = s
            .split_once('@')
            .ok_or_else(|| format!("Invalid next-hop key: {}", s))?;
        if interface.is_empty() {
            return Err(format!("Invalid next-hop key: {}", s));
        }
        let ip: IpAddress = ip
            .parse()
            .map_err(|_| format!("Invalid next-hop address: {}", s))?;
        Ok(Self::new(ip, interface))
    }
}

/// An installed next-hop object.
#[derive(Debug, Clone)]
pub struct NextHopEntry {
    pub key: NextHopKey,
    pub mac: MacAddress,
    pub oid: NextHopOid,
}
