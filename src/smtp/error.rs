use std::io;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

/// Failures of the transport underneath the SMTP conversation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("no usable socket address for {host}")]
    NoAddress { host: String },
    #[error("address lookup for {host} failed: {source}")]
    Lookup {
        host: String,
        #[source]
        source: ResolveError,
    },
    #[error("connection closed by peer")]
    Closed,
    #[error("timed out")]
    TimedOut,
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("TLS unavailable: {0}")]
    TlsUnavailable(String),
    #[error("TLS handshake failed: {source}")]
    Tls {
        #[source]
        source: native_tls::Error,
    },
    #[error("TLS handshake stalled")]
    TlsStalled,
}

impl TransportError {
    pub(crate) fn io(source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::TimedOut,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Closed,
            _ => Self::Io { source },
        }
    }

    pub(crate) fn connect(host: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            host: host.into(),
            source,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Whether this failure comes from a TLS negotiation that was attempted.
    pub fn is_tls_failure(&self) -> bool {
        matches!(self, Self::Tls { .. } | Self::TlsStalled)
    }
}
