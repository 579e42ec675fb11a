use std::collections::BTreeMap;
use std::fmt;

use super::DeliverabilityError;
use crate::smtp::{ProbeOutcome, ProbeReport, SmtpMessage, Stage};

/// Per-host SMTP diagnostics, ordered by host name.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpMessages(BTreeMap<String, SmtpMessage>);

impl SmtpMessages {
    pub fn get(&self, host: &str) -> Option<&SmtpMessage> {
        self.0.get(host)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SmtpMessage)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, SmtpMessage> {
        self.0
    }
}

impl fmt::Display for SmtpMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no host probed");
        }
        for (index, (host, message)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{host}: {message}")?;
        }
        Ok(())
    }
}

/// Three-way answer of [`check_permissive`](super::check_permissive).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Deliverable,
    Undeliverable,
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deliverable => "deliverable",
            Self::Undeliverable => "undeliverable",
            Self::Unknown => "unknown",
        })
    }
}

/// Outcomes collected across probed hosts.
#[derive(Debug, Default)]
pub(crate) struct VerdictAggregate {
    accepted: bool,
    rejected: BTreeMap<String, SmtpMessage>,
    temporary: BTreeMap<String, SmtpMessage>,
    communication: BTreeMap<String, SmtpMessage>,
}

impl VerdictAggregate {
    pub(crate) fn record(&mut self, host: &str, outcome: &ProbeOutcome) {
        let message = outcome.message();
        let bucket = match outcome {
            ProbeOutcome::Accepted { .. } => {
                self.accepted = true;
                return;
            }
            ProbeOutcome::Rejected { .. } => &mut self.rejected,
            ProbeOutcome::Ambiguous {
                stage: Stage::RcptTo,
                ..
            } => &mut self.temporary,
            ProbeOutcome::Ambiguous { .. } => &mut self.communication,
        };
        bucket.insert(host.to_string(), message);
    }

    pub(crate) fn verdict(self) -> Result<bool, DeliverabilityError> {
        if self.accepted {
            return Ok(true);
        }
        let only_rejections =
            !self.rejected.is_empty() && self.temporary.is_empty() && self.communication.is_empty();
        let has_communication = !self.communication.is_empty();
        let has_temporary = !self.temporary.is_empty();

        let mut all = self.rejected;
        all.extend(self.temporary);
        all.extend(self.communication);
        let messages = SmtpMessages(all);

        Err(if only_rejections {
            DeliverabilityError::NotDeliverable { messages }
        } else if has_temporary && !has_communication {
            DeliverabilityError::Temporary { messages }
        } else {
            // also covers "nothing probed": the budget ran out first
            DeliverabilityError::Communication { messages }
        })
    }
}

/// Everything learned while checking one address.
#[derive(Debug)]
pub struct CheckReport {
    /// Hosts resolved for the address, in probe order.
    pub candidates: Vec<String>,
    /// One report per host actually probed.
    pub probes: Vec<ProbeReport>,
    pub result: Result<bool, DeliverabilityError>,
}

impl CheckReport {
    pub(crate) fn failed(err: impl Into<DeliverabilityError>) -> Self {
        Self {
            candidates: Vec::new(),
            probes: Vec::new(),
            result: Err(err.into()),
        }
    }

    pub fn verdict(&self) -> Result<Verdict, &DeliverabilityError> {
        match &self.result {
            Ok(_) => Ok(Verdict::Deliverable),
            Err(err) => permissive(err).ok_or(err),
        }
    }
}

pub(crate) fn permissive(err: &DeliverabilityError) -> Option<Verdict> {
    match err {
        DeliverabilityError::Mx(_) => None,
        DeliverabilityError::NotDeliverable { .. } => Some(Verdict::Undeliverable),
        DeliverabilityError::Temporary { .. } | DeliverabilityError::Communication { .. } => {
            Some(Verdict::Unknown)
        }
    }
}
