use std::fmt;

/// A raw SMTP reply: numeric status code plus one text entry per reply line.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![text.into()],
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        self.code >= 500
    }

    /// A 4xx or 5xx reply.
    pub fn is_failure(&self) -> bool {
        self.is_transient_failure() || self.is_permanent_failure()
    }

    /// EHLO keyword lookup; the first line is the server greeting and is skipped.
    pub fn has_capability(&self, cap: &str) -> bool {
        self.lines.iter().skip(1).any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|token| token.eq_ignore_ascii_case(cap))
        })
    }

    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

/// The conversation step a message or failure belongs to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connect,
    Helo,
    StartTls,
    MailFrom,
    RcptTo,
    Quit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Helo => "HELO",
            Self::StartTls => "STARTTLS",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-host diagnostic: the command, the reply code and the reply text.
///
/// `code` is `0` when no reply was received (connection failure or peer
/// disconnect) and `-1` for a failed TLS negotiation.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpMessage {
    pub command: Stage,
    pub code: i32,
    pub text: String,
}

impl SmtpMessage {
    pub fn new(command: Stage, code: i32, text: impl Into<String>) -> Self {
        Self {
            command,
            code,
            text: text.into(),
        }
    }
}

impl fmt::Display for SmtpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.command, self.code, self.text)
    }
}

pub(crate) const NO_REPLY: i32 = 0;
pub(crate) const TLS_FAILURE: i32 = -1;

/// Classified result of probing one host.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server accepted the recipient (2xx/3xx to `RCPT TO`).
    Accepted { code: u16, text: String },
    /// The server refused the recipient (5xx to `RCPT TO`).
    Rejected { code: u16, text: String },
    /// No recipient verdict: temporary failure, refusal or disconnect before
    /// `RCPT TO` completed, or a failed TLS negotiation.
    Ambiguous { stage: Stage, code: i32, text: String },
}

impl ProbeOutcome {
    pub(crate) fn ambiguous(stage: Stage, code: i32, text: impl Into<String>) -> Self {
        Self::Ambiguous {
            stage,
            code,
            text: text.into(),
        }
    }

    pub(crate) fn from_reply(stage: Stage, reply: &SmtpReply) -> Self {
        Self::ambiguous(stage, i32::from(reply.code), reply.text())
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn message(&self) -> SmtpMessage {
        match self {
            Self::Accepted { code, text } | Self::Rejected { code, text } => {
                SmtpMessage::new(Stage::RcptTo, i32::from(*code), text.clone())
            }
            Self::Ambiguous { stage, code, text } => SmtpMessage::new(*stage, *code, text.clone()),
        }
    }
}

/// A recorded transcript event used for diagnostics.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpEvent {
    Sent { stage: Stage, command: String },
    Received { stage: Stage, reply: SmtpReply },
    Error { stage: Stage, message: String },
}

impl fmt::Display for SmtpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent { command, .. } => write!(f, "C: {command}"),
            Self::Received { reply, .. } => write!(f, "S: {} {}", reply.code, reply.text()),
            Self::Error { stage, message } => write!(f, "!  {stage}: {message}"),
        }
    }
}

/// Outcome and transcript of one probed host.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub host: String,
    pub outcome: ProbeOutcome,
    pub events: Vec<SmtpEvent>,
}
