//! Email address model: user/domain split and ASCII-compatible encoding.

mod error;

pub use error::AddressFormatError;

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

/// An email address split on its last `@`, with the domain transcoded to its
/// ASCII-compatible encoding (ACE).
///
/// A bracketed domain (`user@[192.0.2.1]`) is a domain literal: it is parsed
/// as an IP address and never passed through IDNA.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    user: String,
    domain: String,
    ace_domain: String,
    literal_ip: Option<IpAddr>,
}

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, AddressFormatError> {
        let (user, domain) = raw.rsplit_once('@').ok_or(AddressFormatError::MissingAt)?;
        if user.is_empty() {
            return Err(AddressFormatError::EmptyUser);
        }
        if domain.is_empty() {
            return Err(AddressFormatError::EmptyDomain);
        }

        let (ace_domain, literal_ip) = match domain_literal(domain) {
            Some(inner) => {
                let ip = parse_literal(inner)?;
                (domain.to_string(), Some(ip))
            }
            None => (to_ace(domain)?, None),
        };

        Ok(Self {
            user: user.to_string(),
            domain: domain.to_string(),
            ace_domain,
            literal_ip,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn ace_domain(&self) -> &str {
        &self.ace_domain
    }

    /// The IP address of a domain literal, if the domain is one.
    pub fn literal_ip(&self) -> Option<IpAddr> {
        self.literal_ip
    }

    pub fn is_domain_literal_ip(&self) -> bool {
        self.literal_ip.is_some()
    }

    /// The full address with the domain in ACE form, as sent on the wire.
    pub fn ace(&self) -> String {
        format!("{}@{}", self.user, self.ace_domain)
    }
}

impl FromStr for EmailAddress {
    type Err = AddressFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.domain)
    }
}

fn domain_literal(domain: &str) -> Option<&str> {
    domain.strip_prefix('[')?.strip_suffix(']')
}

fn parse_literal(inner: &str) -> Result<IpAddr, AddressFormatError> {
    // RFC 5321 4.1.3 tags IPv6 literals with "IPv6:"
    let tagged = inner
        .get(..5)
        .filter(|tag| tag.eq_ignore_ascii_case("IPv6:"))
        .map(|_| &inner[5..]);
    let parsed = match tagged {
        Some(v6) => v6.parse::<Ipv6Addr>().map(IpAddr::V6).ok(),
        None => inner.parse::<IpAddr>().ok(),
    };
    parsed.ok_or_else(|| AddressFormatError::invalid_literal(inner))
}

fn to_ace(domain: &str) -> Result<String, AddressFormatError> {
    if domain.is_ascii() {
        return Ok(domain.to_string());
    }
    idna::domain_to_ascii(domain).map_err(|err| AddressFormatError::idna(domain, err))
}
