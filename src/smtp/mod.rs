//! SMTP recipient probing: one conversation with one mail host, stopping
//! right after `RCPT TO`.

mod error;
mod options;
mod probe;
mod transport;
mod types;

pub use error::TransportError;
pub use options::{DEFAULT_HELO_HOST, DEFAULT_SMTP_PORT, ProbeOptions};
pub use probe::probe;
pub use transport::{Connector, SmtpTransport, TcpConnector, TcpTransport};
pub use types::{ProbeOutcome, ProbeReport, SmtpEvent, SmtpMessage, SmtpReply, Stage};

#[cfg(test)]
pub(crate) mod tests;
