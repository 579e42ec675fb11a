use thiserror::Error;

/// Raised when an address cannot be split, transcoded or fails the syntax
/// rules of [`check_syntax`](crate::check_syntax).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressFormatError {
    #[error("address has no '@' separator")]
    MissingAt,
    #[error("user part is empty")]
    EmptyUser,
    #[error("domain part is empty")]
    EmptyDomain,
    #[error("invalid domain literal '{literal}'")]
    InvalidLiteral { literal: String },
    #[error("domain '{domain}' cannot be IDNA-encoded: {reason}")]
    Idna { domain: String, reason: String },
    #[error("invalid user part '{user}'")]
    InvalidUser { user: String },
    #[error("invalid domain '{domain}'")]
    InvalidDomain { domain: String },
}

impl AddressFormatError {
    pub(crate) fn invalid_literal(literal: impl Into<String>) -> Self {
        Self::InvalidLiteral {
            literal: literal.into(),
        }
    }

    pub(crate) fn idna<T: std::fmt::Display>(domain: impl Into<String>, err: T) -> Self {
        Self::Idna {
            domain: domain.into(),
            reason: err.to_string(),
        }
    }
}
