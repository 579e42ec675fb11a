//! One-call validation: parsing, syntax, domain lists, then DNS and SMTP.

use thiserror::Error;
use tracing::{debug, warn};

use crate::address::{AddressFormatError, EmailAddress};
use crate::deliverability::{self, CheckOptions, DeliverabilityError, Verdict};
use crate::domainlist::{DomainBlockedError, DomainListChecker};
use crate::smtp::ProbeReport;
use crate::syntax::check_syntax;

/// Switches and settings for [`validate_email_or_fail`].
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    pub check_syntax: bool,
    pub check_domain_list: bool,
    pub check_dns: bool,
    pub check_smtp: bool,
    /// Envelope sender for the probe; the address itself when `None`.
    pub sender: Option<String>,
    pub domain_list: DomainListChecker,
    pub check: CheckOptions,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_syntax: true,
            check_domain_list: true,
            check_dns: true,
            check_smtp: true,
            sender: None,
            domain_list: DomainListChecker::default(),
            check: CheckOptions::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Format(#[from] AddressFormatError),
    #[error("invalid sender address: {source}")]
    Sender {
        #[source]
        source: AddressFormatError,
    },
    #[error(transparent)]
    Blocked(#[from] DomainBlockedError),
    #[error(transparent)]
    Deliverability(#[from] DeliverabilityError),
}

impl ValidationError {
    /// Temporary and communication failures leave the address undecided.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Deliverability(err) if err.is_ambiguous())
    }

    /// Collapses the error into a [`Verdict`].
    pub fn verdict(&self) -> Verdict {
        if self.is_ambiguous() {
            Verdict::Unknown
        } else {
            Verdict::Undeliverable
        }
    }
}

/// Result of one validation, with whatever DNS and SMTP detail was gathered.
#[derive(Debug)]
pub struct ValidationReport {
    pub address: String,
    pub candidates: Vec<String>,
    pub probes: Vec<ProbeReport>,
    pub result: Result<bool, ValidationError>,
}

impl ValidationReport {
    fn early(address: &str, result: Result<bool, ValidationError>) -> Self {
        Self {
            address: address.to_string(),
            candidates: Vec::new(),
            probes: Vec::new(),
            result,
        }
    }

    pub fn verdict(&self) -> Verdict {
        match &self.result {
            Ok(_) => Verdict::Deliverable,
            Err(err) => err.verdict(),
        }
    }
}

/// Validates `raw` and returns `Ok(true)` or the first failing step's error.
pub fn validate_email_or_fail(
    raw: &str,
    options: &ValidationOptions,
) -> Result<bool, ValidationError> {
    validate_detailed(raw, options).result
}

/// Like [`validate_email_or_fail`], but never fails: `Some(true)` when the
/// address validates, `None` when SMTP could not decide and `Some(false)`
/// otherwise.
pub fn validate_email(raw: &str, options: &ValidationOptions) -> Option<bool> {
    match validate_email_or_fail(raw, options) {
        Ok(valid) => Some(valid),
        Err(err) if err.is_ambiguous() => {
            warn!(address = raw, error = %err, "validation inconclusive");
            None
        }
        Err(err) => {
            warn!(address = raw, error = %err, "validation failed");
            Some(false)
        }
    }
}

/// Runs every enabled step and keeps resolution and probe detail.
pub fn validate_detailed(raw: &str, options: &ValidationOptions) -> ValidationReport {
    let address = match prepare(raw, options) {
        Ok(address) => address,
        Err(err) => return ValidationReport::early(raw, Err(err)),
    };
    if !(options.check_dns || options.check_smtp) {
        return ValidationReport::early(raw, Ok(true));
    }

    let sender = match options.sender.as_deref().map(EmailAddress::parse).transpose() {
        Ok(sender) => sender,
        Err(source) => return ValidationReport::early(raw, Err(ValidationError::Sender { source })),
    };

    let mut check = options.check.clone();
    check.skip_smtp |= !options.check_smtp;
    let report = deliverability::check_detailed(&address, sender.as_ref(), &check);
    ValidationReport {
        address: raw.to_string(),
        candidates: report.candidates,
        probes: report.probes,
        result: report.result.map_err(ValidationError::from),
    }
}

fn prepare(raw: &str, options: &ValidationOptions) -> Result<EmailAddress, ValidationError> {
    let address = EmailAddress::parse(raw)?;
    if options.check_syntax {
        check_syntax(&address)?;
    }
    if options.check_domain_list {
        options.domain_list.check(&address)?;
    }
    debug!(address = %address, "pre-DNS checks passed");
    Ok(address)
}
