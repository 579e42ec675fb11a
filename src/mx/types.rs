use std::net::{IpAddr, SocketAddr};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// Mail hosts to probe, in preference order. Never empty: an empty result
/// is reported as [`MxError::NoValidMx`](crate::MxError::NoValidMx).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxCandidates {
    hosts: Vec<String>,
}

impl MxCandidates {
    pub(crate) fn new(hosts: Vec<String>) -> Option<Self> {
        if hosts.is_empty() {
            None
        } else {
            Some(Self { hosts })
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.hosts.iter()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl<'a> IntoIterator for &'a MxCandidates {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}

/// IP families the probe may connect over.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFamilies {
    pub ipv4: bool,
    pub ipv6: bool,
}

impl Default for AddressFamilies {
    fn default() -> Self {
        Self::BOTH
    }
}

impl AddressFamilies {
    pub const BOTH: Self = Self {
        ipv4: true,
        ipv6: true,
    };
    pub const IPV4_ONLY: Self = Self {
        ipv4: true,
        ipv6: false,
    };
    pub const IPV6_ONLY: Self = Self {
        ipv4: false,
        ipv6: true,
    };

    pub fn allows(&self, ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(_) => self.ipv4,
            IpAddr::V6(_) => self.ipv6,
        }
    }

    pub fn allows_socket(&self, addr: &SocketAddr) -> bool {
        self.allows(&addr.ip())
    }
}
