use std::time::Duration;

use crate::smtp::ProbeOptions;

pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Controls resolution and probing for [`check`](super::check).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Per-query DNS timeout.
    pub dns_timeout: Duration,
    /// Total budget shared by every SMTP probe of one check.
    pub smtp_timeout: Duration,
    /// Stop after a successful MX resolution.
    pub skip_smtp: bool,
    pub probe: ProbeOptions,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            smtp_timeout: DEFAULT_SMTP_TIMEOUT,
            skip_smtp: false,
            probe: ProbeOptions::default(),
        }
    }
}

impl CheckOptions {
    pub fn with_skip_smtp(mut self, skip: bool) -> Self {
        self.skip_smtp = skip;
        self
    }

    pub fn with_smtp_timeout(mut self, timeout: Duration) -> Self {
        self.smtp_timeout = timeout;
        self
    }

    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }
}
