use std::collections::HashSet;
use std::io;
use std::net::IpAddr;
use std::time::Duration;

use tracing::{debug, warn};
use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    proto::{error::ProtoErrorKind, op::ResponseCode},
    system_conf::read_system_conf,
};

use super::{AddressFamilies, Error, MxCandidates, MxRecord};
use crate::address::EmailAddress;
use crate::syntax::is_valid_hostname;

/// Resolves the mail hosts responsible for `address`.
///
/// A domain literal short-circuits to itself without any DNS query. Otherwise
/// one MX query is issued against the system resolver with `timeout` as the
/// per-query budget.
pub fn resolve(
    address: &EmailAddress,
    timeout: Duration,
    families: AddressFamilies,
) -> Result<MxCandidates, Error> {
    resolve_address_with(&SystemResolver::new(timeout), address, families)
}

/// Resolves a bare domain (IDNA-normalized first), as used by `mx` lookups
/// that do not start from a full address.
pub fn resolve_domain(domain: &str, timeout: Duration) -> Result<MxCandidates, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = build_resolver(timeout)?;
    resolve_with(&resolver, &ascii)
}

pub(crate) fn resolve_address_with<R>(
    resolver: &R,
    address: &EmailAddress,
    families: AddressFamilies,
) -> Result<MxCandidates, Error>
where
    R: LookupMx + ?Sized,
{
    match address.literal_ip() {
        Some(ip) => literal_candidates(address.domain(), ip, families),
        None => resolve_with(resolver, address.ace_domain()),
    }
}

/// Looks up MX records through `resolver` and turns them into candidates:
/// preference order, trailing dot stripped, duplicates and syntactically
/// invalid host names removed.
pub fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxCandidates, Error>
where
    R: LookupMx + ?Sized,
{
    let records = resolver.lookup_mx(ascii_domain)?;
    if records.is_empty() {
        return Err(Error::no_mx(ascii_domain));
    }

    let hosts = candidate_hosts(records);
    debug!(domain = ascii_domain, hosts = ?hosts, "resolved MX");
    MxCandidates::new(hosts).ok_or_else(|| Error::no_valid_mx(ascii_domain))
}

fn candidate_hosts(mut records: Vec<MxRecord>) -> Vec<String> {
    // stable: equal preferences keep answer order
    records.sort_by_key(|record| record.preference);

    let mut seen = HashSet::new();
    let mut hosts = Vec::new();
    for record in records {
        let host = normalize_exchange(record.exchange);
        if !seen.insert(host.clone()) {
            debug!(host = %host, "duplicate MX host skipped");
            continue;
        }
        if !is_valid_hostname(&host) {
            debug!(host = %host, "invalid MX host name skipped");
            continue;
        }
        hosts.push(host);
    }
    hosts
}

fn literal_candidates(
    domain: &str,
    ip: IpAddr,
    families: AddressFamilies,
) -> Result<MxCandidates, Error> {
    if !families.allows(&ip) {
        return Err(Error::no_valid_mx(domain));
    }
    MxCandidates::new(vec![ip.to_string()]).ok_or_else(|| Error::no_valid_mx(domain))
}

pub(crate) fn build_resolver(timeout: Duration) -> Result<Resolver, Error> {
    let (config, mut opts) = read_system_conf().map_err(Error::resolver_init)?;
    opts.timeout = timeout;
    Resolver::new(config, opts).map_err(Error::resolver_init)
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

/// Maps a resolver failure onto the closed MX error taxonomy.
pub(crate) fn classify_resolve_error(domain: &str, err: &ResolveError) -> Error {
    match err.kind() {
        ResolveErrorKind::Timeout => Error::dns_timeout(domain),
        ResolveErrorKind::NoConnections => Error::no_nameserver(domain),
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            classify_response_code(domain, *response_code)
        }
        ResolveErrorKind::Io(source) if source.kind() == io::ErrorKind::TimedOut => {
            Error::dns_timeout(domain)
        }
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            Error::dns_timeout(domain)
        }
        _ => Error::no_nameserver(domain),
    }
}

pub(crate) fn classify_response_code(domain: &str, code: ResponseCode) -> Error {
    match code {
        ResponseCode::NXDomain => Error::domain_not_found(domain),
        ResponseCode::NoError => Error::no_mx(domain),
        ResponseCode::ServFail | ResponseCode::Refused => Error::no_nameserver(domain),
        _ => Error::dns_configuration(domain),
    }
}

/// The DNS seam: anything able to answer an MX query for an ASCII domain.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        let lookup = Resolver::mx_lookup(self, domain).map_err(|err| {
            warn!(domain, error = %err, "MX lookup failed");
            classify_resolve_error(domain, &err)
        })?;
        let mut records = Vec::new();
        for mx in lookup.iter() {
            records.push(MxRecord::new(mx.preference(), mx.exchange().to_utf8()));
        }
        Ok(records)
    }
}

/// The system resolver, built from the host configuration on each query so
/// that literal addresses never touch DNS configuration at all.
#[derive(Debug, Clone, Copy)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl LookupMx for SystemResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        build_resolver(self.timeout)?.lookup_mx(domain)
    }
}

#[cfg(test)]
impl LookupMx for crate::mx::tests::StubResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        (self.on_lookup)(domain)
    }
}
