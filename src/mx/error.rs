use thiserror::Error;

/// Mutually exclusive failures of MX resolution.
#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("domain {domain} not found")]
    DomainNotFound { domain: String },
    #[error("no nameserver answered for {domain}")]
    NoNameserver { domain: String },
    #[error("DNS lookup for {domain} timed out")]
    DnsTimeout { domain: String },
    #[error("misconfigured DNS entries for {domain}")]
    DnsConfiguration { domain: String },
    #[error("no MX record for {domain}")]
    NoMx { domain: String },
    #[error("no valid MX record for {domain}")]
    NoValidMx { domain: String },
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn domain_not_found(domain: &str) -> Self {
        Self::DomainNotFound {
            domain: domain.to_string(),
        }
    }

    pub(crate) fn no_nameserver(domain: &str) -> Self {
        Self::NoNameserver {
            domain: domain.to_string(),
        }
    }

    pub(crate) fn dns_timeout(domain: &str) -> Self {
        Self::DnsTimeout {
            domain: domain.to_string(),
        }
    }

    pub(crate) fn dns_configuration(domain: &str) -> Self {
        Self::DnsConfiguration {
            domain: domain.to_string(),
        }
    }

    pub(crate) fn no_mx(domain: &str) -> Self {
        Self::NoMx {
            domain: domain.to_string(),
        }
    }

    pub(crate) fn no_valid_mx(domain: &str) -> Self {
        Self::NoValidMx {
            domain: domain.to_string(),
        }
    }
}
