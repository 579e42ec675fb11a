//! Deliverability check: resolve the mail hosts of an address, probe them in
//! preference order, and reduce the outcomes to one verdict.

mod error;
mod options;
mod types;

pub use error::DeliverabilityError;
pub use options::{CheckOptions, DEFAULT_DNS_TIMEOUT, DEFAULT_SMTP_TIMEOUT};
pub use types::{CheckReport, SmtpMessages, Verdict};

use tracing::{debug, info, warn};

use crate::address::EmailAddress;
use crate::deadline::Deadline;
use crate::mx::{self, LookupMx, SystemResolver};
use crate::smtp::{self, Connector, TcpConnector};
use types::VerdictAggregate;

/// Returns `Ok(true)` when some mail host of `address` accepts it as a
/// recipient, or the typed reason why not.
///
/// `from` is the envelope sender; it defaults to `address` itself.
pub fn check(
    address: &EmailAddress,
    from: Option<&EmailAddress>,
    options: &CheckOptions,
) -> Result<bool, DeliverabilityError> {
    check_detailed(address, from, options).result
}

/// Like [`check`], but maps inconclusive SMTP results to
/// [`Verdict::Unknown`] and a definitive refusal to
/// [`Verdict::Undeliverable`]. DNS failures remain errors.
pub fn check_permissive(
    address: &EmailAddress,
    from: Option<&EmailAddress>,
    options: &CheckOptions,
) -> Result<Verdict, DeliverabilityError> {
    match check(address, from, options) {
        Ok(_) => Ok(Verdict::Deliverable),
        Err(err) => match types::permissive(&err) {
            Some(verdict) => {
                debug!(address = %address, error = %err, "treating SMTP failure as {verdict}");
                Ok(verdict)
            }
            None => Err(err),
        },
    }
}

/// Runs a check against the system resolver and real TCP connections,
/// keeping the resolved hosts and per-host transcripts.
pub fn check_detailed(
    address: &EmailAddress,
    from: Option<&EmailAddress>,
    options: &CheckOptions,
) -> CheckReport {
    let resolver = SystemResolver::new(options.dns_timeout);
    let connector = TcpConnector::new(options.probe.port, options.probe.families);
    check_with(&resolver, &connector, address, from, options)
}

/// The check over explicit DNS and transport seams.
pub fn check_with<R, C>(
    resolver: &R,
    connector: &C,
    address: &EmailAddress,
    from: Option<&EmailAddress>,
    options: &CheckOptions,
) -> CheckReport
where
    R: LookupMx + ?Sized,
    C: Connector + ?Sized,
{
    let candidates = match mx::resolve_address_with(resolver, address, options.probe.families) {
        Ok(candidates) => candidates,
        Err(err) => {
            info!(address = %address, error = %err, "MX resolution failed");
            return CheckReport::failed(err);
        }
    };
    let hosts = candidates.hosts().to_vec();

    if options.skip_smtp {
        debug!(address = %address, "SMTP probing skipped");
        return CheckReport {
            candidates: hosts,
            probes: Vec::new(),
            result: Ok(true),
        };
    }

    let sender = from.unwrap_or(address);
    let budget = Deadline::after(options.smtp_timeout);
    let mut aggregate = VerdictAggregate::default();
    let mut probes = Vec::new();

    for host in &hosts {
        let Some(remaining) = budget.remaining() else {
            warn!(address = %address, host = %host, "SMTP budget exhausted; remaining hosts skipped");
            break;
        };
        let report = smtp::probe(connector, host, sender, address, &options.probe, remaining);
        aggregate.record(host, &report.outcome);
        let accepted = report.outcome.is_accepted();
        probes.push(report);
        if accepted {
            info!(address = %address, host = %host, "recipient accepted");
            break;
        }
    }

    let result = aggregate.verdict();
    if let Err(err) = &result {
        info!(address = %address, error = %err, "address not confirmed");
    }
    CheckReport {
        candidates: hosts,
        probes,
        result,
    }
}
