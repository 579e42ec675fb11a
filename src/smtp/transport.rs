use std::io::{Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use native_tls::{HandshakeError, TlsConnector, TlsStream};
use tracing::{debug, warn};
use trust_dns_resolver::{
    Resolver,
    config::LookupIpStrategy,
    error::{ResolveError, ResolveErrorKind},
    system_conf::read_system_conf,
};

use super::{SmtpReply, TransportError};
use crate::deadline::Deadline;
use crate::mx::AddressFamilies;

/// Sockets reject a zero timeout, so every timeout is raised to this floor.
const MIN_IO_TIMEOUT: Duration = Duration::from_millis(1);

/// Longest reply line accepted before the peer is treated as misbehaving.
const MAX_LINE_BYTES: usize = 4096;

/// A line-oriented SMTP channel that can be upgraded to TLS in place.
pub trait SmtpTransport {
    /// Writes `command` followed by CRLF.
    fn send_command(&mut self, command: &str) -> Result<(), TransportError>;

    /// Reads one complete, possibly multi-line, reply.
    fn read_reply(&mut self) -> Result<SmtpReply, TransportError>;

    /// Whether [`SmtpTransport::starttls`] can be attempted at all.
    fn tls_available(&self) -> bool;

    /// Performs the TLS handshake on the open connection, verifying `host`.
    fn starttls(&mut self, host: &str) -> Result<(), TransportError>;

    /// Bounds every subsequent read and write.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError>;

    /// Closes the connection. Further calls fail with a protocol error.
    fn close(&mut self);
}

/// Opens transports to mail hosts.
pub trait Connector {
    type Transport: SmtpTransport;

    fn connect(&self, host: &str, timeout: Duration) -> Result<Self::Transport, TransportError>;
}

/// TCP connector honoring the port, address family and TLS settings.
pub struct TcpConnector {
    port: u16,
    families: AddressFamilies,
    tls: Option<TlsConnector>,
}

impl TcpConnector {
    pub fn new(port: u16, families: AddressFamilies) -> Self {
        let tls = match TlsConnector::new() {
            Ok(connector) => Some(connector),
            Err(err) => {
                warn!(error = %err, "TLS support unavailable; STARTTLS disabled");
                None
            }
        };
        Self {
            port,
            families,
            tls,
        }
    }

    /// A connector that never negotiates TLS.
    pub fn plaintext(port: u16, families: AddressFamilies) -> Self {
        Self {
            port,
            families,
            tls: None,
        }
    }

    /// Addresses of `host` in the allowed families. Host names are looked up
    /// through the system resolver, bounded by what is left of `deadline`.
    fn socket_addrs(
        &self,
        host: &str,
        deadline: &Deadline,
    ) -> Result<Vec<SocketAddr>, TransportError> {
        if let Some(ip) = literal_ip(host) {
            return usable_addrs(host, [ip], self.port, self.families);
        }
        let remaining = deadline.remaining().ok_or(TransportError::TimedOut)?;
        let (config, mut opts) =
            read_system_conf().map_err(|err| TransportError::connect(host, err))?;
        opts.timeout = remaining;
        opts.attempts = 1;
        opts.ip_strategy = lookup_strategy(self.families);
        let resolver =
            Resolver::new(config, opts).map_err(|err| TransportError::connect(host, err))?;
        let lookup = resolver.lookup_ip(host).map_err(|err| lookup_error(host, err))?;
        usable_addrs(host, lookup.iter(), self.port, self.families)
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&self, host: &str, timeout: Duration) -> Result<TcpTransport, TransportError> {
        let deadline = Deadline::after(timeout);
        let mut last_err = None;
        for addr in self.socket_addrs(host, &deadline)? {
            let Some(remaining) = deadline.remaining() else {
                break;
            };
            match TcpStream::connect_timeout(&addr, remaining.max(MIN_IO_TIMEOUT)) {
                Ok(stream) => {
                    debug!(host, %addr, "connected");
                    let mut transport = TcpTransport {
                        state: StreamState::Plain(stream),
                        buffer: Vec::new(),
                        deadline,
                        tls: self.tls.clone(),
                    };
                    transport.set_timeout(deadline.remaining().unwrap_or(MIN_IO_TIMEOUT))?;
                    return Ok(transport);
                }
                Err(err) => {
                    debug!(host, %addr, error = %err, "connect attempt failed");
                    last_err = Some(TransportError::connect(host, err));
                }
            }
        }
        Err(last_err.unwrap_or(TransportError::TimedOut))
    }
}

/// An IP address written as the host, bracketed or not.
pub(crate) fn literal_ip(host: &str) -> Option<IpAddr> {
    let bare = host
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse().ok()
}

pub(crate) fn usable_addrs(
    host: &str,
    ips: impl IntoIterator<Item = IpAddr>,
    port: u16,
    families: AddressFamilies,
) -> Result<Vec<SocketAddr>, TransportError> {
    let usable: Vec<SocketAddr> = ips
        .into_iter()
        .filter(|ip| families.allows(ip))
        .map(|ip| SocketAddr::new(ip, port))
        .collect();
    if usable.is_empty() {
        return Err(TransportError::NoAddress {
            host: host.to_string(),
        });
    }
    Ok(usable)
}

pub(crate) fn lookup_strategy(families: AddressFamilies) -> LookupIpStrategy {
    match (families.ipv4, families.ipv6) {
        (true, false) => LookupIpStrategy::Ipv4Only,
        (false, true) => LookupIpStrategy::Ipv6Only,
        _ => LookupIpStrategy::Ipv4AndIpv6,
    }
}

fn lookup_error(host: &str, source: ResolveError) -> TransportError {
    match source.kind() {
        ResolveErrorKind::Timeout => TransportError::TimedOut,
        ResolveErrorKind::NoRecordsFound { .. } => TransportError::NoAddress {
            host: host.to_string(),
        },
        _ => TransportError::Lookup {
            host: host.to_string(),
            source,
        },
    }
}

#[derive(Debug)]
enum StreamState {
    Plain(TcpStream),
    Tls(TlsStream<TcpStream>),
    Invalid,
}

/// A TCP connection, plain or TLS-wrapped, with a reply read buffer.
#[derive(Debug)]
pub struct TcpTransport {
    state: StreamState,
    buffer: Vec<u8>,
    deadline: Deadline,
    tls: Option<TlsConnector>,
}

impl TcpTransport {
    fn tcp(&self) -> Option<&TcpStream> {
        match &self.state {
            StreamState::Plain(stream) => Some(stream),
            StreamState::Tls(stream) => Some(stream.get_ref()),
            StreamState::Invalid => None,
        }
    }

    /// Re-arms the socket read timeout with what is left of the deadline.
    fn arm_read(&self) -> Result<(), TransportError> {
        let remaining = self.deadline.remaining().ok_or(TransportError::TimedOut)?;
        let stream = self.tcp().ok_or_else(invalid_state)?;
        stream
            .set_read_timeout(Some(remaining.max(MIN_IO_TIMEOUT)))
            .map_err(TransportError::io)
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(trim_line_ending(&line)).into_owned());
            }
            if self.buffer.len() >= MAX_LINE_BYTES {
                return Err(TransportError::protocol(format!(
                    "reply line exceeds {MAX_LINE_BYTES} bytes"
                )));
            }
            self.arm_read()?;

            let mut buf = [0u8; 512];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut buf),
                StreamState::Tls(stream) => stream.read(&mut buf),
                StreamState::Invalid => return Err(invalid_state()),
            };
            let read = read.map_err(TransportError::io)?;
            if read == 0 {
                return Err(TransportError::Closed);
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

impl SmtpTransport for TcpTransport {
    fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        let result = match &mut self.state {
            StreamState::Plain(stream) => stream.write_all(&data).and_then(|()| stream.flush()),
            StreamState::Tls(stream) => stream.write_all(&data).and_then(|()| stream.flush()),
            StreamState::Invalid => return Err(invalid_state()),
        };
        result.map_err(TransportError::io)
    }

    fn read_reply(&mut self) -> Result<SmtpReply, TransportError> {
        let mut reader = ReplyReader::default();
        loop {
            let line = self.read_line()?;
            if let Some(reply) = reader.push(&line)? {
                return Ok(reply);
            }
        }
    }

    fn tls_available(&self) -> bool {
        self.tls.is_some()
    }

    fn starttls(&mut self, host: &str) -> Result<(), TransportError> {
        let Some(connector) = self.tls.clone() else {
            return Err(TransportError::TlsUnavailable(
                "no TLS connector configured".into(),
            ));
        };
        // the handshake reads under the same deadline as the replies
        self.arm_read()?;
        let plain = match std::mem::replace(&mut self.state, StreamState::Invalid) {
            StreamState::Plain(stream) => stream,
            StreamState::Tls(stream) => {
                self.state = StreamState::Tls(stream);
                return Ok(());
            }
            StreamState::Invalid => return Err(invalid_state()),
        };
        // bytes buffered before the handshake belong to the plaintext session
        self.buffer.clear();
        self.state = StreamState::Tls(complete_handshake(&connector, host, plain)?);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.deadline = Deadline::after(timeout);
        let timeout = Some(timeout.max(MIN_IO_TIMEOUT));
        let stream = self.tcp().ok_or_else(invalid_state)?;
        stream.set_read_timeout(timeout).map_err(TransportError::io)?;
        stream.set_write_timeout(timeout).map_err(TransportError::io)
    }

    fn close(&mut self) {
        match std::mem::replace(&mut self.state, StreamState::Invalid) {
            StreamState::Plain(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
            }
            StreamState::Tls(mut stream) => {
                let _ = stream.shutdown();
                let _ = stream.get_ref().shutdown(Shutdown::Both);
            }
            StreamState::Invalid => {}
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn invalid_state() -> TransportError {
    TransportError::protocol("connection is closed")
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn complete_handshake(
    connector: &TlsConnector,
    host: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, TransportError> {
    match connector.connect(host, stream) {
        Ok(tls) => Ok(tls),
        Err(HandshakeError::Failure(source)) => Err(TransportError::Tls { source }),
        // the socket is blocking, so WouldBlock only surfaces when a read timed out
        Err(HandshakeError::WouldBlock(_)) => Err(TransportError::TlsStalled),
    }
}

/// Accumulates reply lines until the final line (no `-` after the code).
#[derive(Debug, Default)]
pub(crate) struct ReplyReader {
    code: Option<u16>,
    lines: Vec<String>,
}

impl ReplyReader {
    pub(crate) fn push(&mut self, line: &str) -> Result<Option<SmtpReply>, TransportError> {
        let parsed = line
            .get(..3)
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u16>().ok())
            .ok_or_else(|| TransportError::protocol(format!("invalid reply line: {line}")))?;
        match self.code {
            Some(existing) if existing != parsed => {
                return Err(TransportError::protocol(format!(
                    "inconsistent reply codes: {existing} vs {parsed}"
                )));
            }
            Some(_) => {}
            None => self.code = Some(parsed),
        }

        let continued = line.as_bytes().get(3) == Some(&b'-');
        self.lines.push(line.get(4..).unwrap_or_default().to_string());
        if continued {
            return Ok(None);
        }
        Ok(Some(SmtpReply {
            code: parsed,
            lines: std::mem::take(&mut self.lines),
        }))
    }
}
