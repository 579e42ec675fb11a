use thiserror::Error;

use super::SmtpMessages;
use crate::mx::Error as MxError;

/// Why an address could not be confirmed deliverable.
#[derive(Debug, Error)]
pub enum DeliverabilityError {
    #[error(transparent)]
    Mx(#[from] MxError),
    /// Every probed host refused the recipient.
    #[error("address not deliverable: {messages}")]
    NotDeliverable { messages: SmtpMessages },
    /// Only temporary recipient refusals were seen; retrying later may help.
    #[error("temporary SMTP failure: {messages}")]
    Temporary { messages: SmtpMessages },
    /// At least one host could not be talked to up to the recipient check.
    #[error("SMTP communication failed: {messages}")]
    Communication { messages: SmtpMessages },
}

impl DeliverabilityError {
    /// The per-host diagnostics for SMTP-level failures.
    pub fn messages(&self) -> Option<&SmtpMessages> {
        match self {
            Self::Mx(_) => None,
            Self::NotDeliverable { messages }
            | Self::Temporary { messages }
            | Self::Communication { messages } => Some(messages),
        }
    }

    /// Whether the failure leaves the address' status undecided.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Temporary { .. } | Self::Communication { .. })
    }
}
