#![forbid(unsafe_code)]
//! mxprobe: email deliverability checks through address parsing, MX resolution and
//! SMTP recipient probing without sending mail.

mod deadline;

pub mod address;
pub mod deliverability;
pub mod domainlist;
pub mod mx;
pub mod smtp;
pub mod syntax;
pub mod validate;

pub use address::{AddressFormatError, EmailAddress};
pub use deliverability::{
    CheckOptions, CheckReport, DeliverabilityError, SmtpMessages, Verdict, check,
    check_detailed, check_permissive, check_with,
};
pub use domainlist::{
    Blocklist, BlocklistError, DomainBlockedError, DomainListChecker, RefreshingBlocklist,
};
pub use mx::{AddressFamilies, Error as MxError, LookupMx, MxCandidates, MxRecord, resolve};
pub use smtp::{ProbeOptions, ProbeOutcome, ProbeReport, SmtpMessage, Stage};
pub use syntax::check_syntax;
pub use validate::{
    ValidationError, ValidationOptions, ValidationReport, validate_detailed, validate_email,
    validate_email_or_fail,
};
