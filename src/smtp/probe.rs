use std::time::Duration;

use tracing::{debug, info};

use super::types::{NO_REPLY, TLS_FAILURE};
use super::{
    Connector, ProbeOptions, ProbeOutcome, ProbeReport, SmtpEvent, SmtpReply, SmtpTransport,
    Stage, TransportError,
};
use crate::address::EmailAddress;
use crate::deadline::Deadline;

/// How long `QUIT` may wait for its reply, whatever the probe budget left.
const QUIT_TIMEOUT_FLOOR: Duration = Duration::from_millis(100);
const QUIT_TIMEOUT_CEILING: Duration = Duration::from_secs(1);

type Step<T> = Result<T, ProbeOutcome>;

/// Probes one mail host: asks whether it would accept mail for `recipient`
/// from `sender`, without sending a message.
///
/// The conversation runs greeting, `EHLO` (falling back to `HELO`), optional
/// `STARTTLS`, `MAIL FROM` and `RCPT TO`. `timeout` bounds the whole probe;
/// each command gets whatever is left of it. The connection is always closed
/// before returning, after a best-effort `QUIT`.
pub fn probe<C>(
    connector: &C,
    host: &str,
    sender: &EmailAddress,
    recipient: &EmailAddress,
    options: &ProbeOptions,
    timeout: Duration,
) -> ProbeReport
where
    C: Connector + ?Sized,
{
    let deadline = Deadline::after(timeout);
    let mut events = Vec::new();

    let mut transport = match connector.connect(host, timeout) {
        Ok(transport) => transport,
        Err(err) => {
            debug!(host, error = %err, "connect failed");
            events.push(SmtpEvent::Error {
                stage: Stage::Connect,
                message: err.to_string(),
            });
            return finish(host, events, transport_outcome(Stage::Connect, &err));
        }
    };

    let mut session = Session {
        transport: &mut transport,
        deadline,
        events,
        open: true,
    };
    let outcome = match session.converse(host, sender, recipient, options) {
        Ok(outcome) | Err(outcome) => outcome,
    };
    session.quit();
    let events = session.events;
    transport.close();

    finish(host, events, outcome)
}

fn finish(host: &str, events: Vec<SmtpEvent>, outcome: ProbeOutcome) -> ProbeReport {
    info!(host, outcome = ?outcome, "probe finished");
    ProbeReport {
        host: host.to_string(),
        outcome,
        events,
    }
}

/// Maps a recipient reply onto an outcome.
pub(crate) fn classify_rcpt(reply: &SmtpReply) -> ProbeOutcome {
    if reply.is_permanent_failure() {
        ProbeOutcome::Rejected {
            code: reply.code,
            text: reply.text(),
        }
    } else if reply.is_transient_failure() || reply.code < 200 {
        ProbeOutcome::from_reply(Stage::RcptTo, reply)
    } else {
        ProbeOutcome::Accepted {
            code: reply.code,
            text: reply.text(),
        }
    }
}

fn transport_outcome(stage: Stage, err: &TransportError) -> ProbeOutcome {
    ProbeOutcome::ambiguous(stage, NO_REPLY, err.to_string())
}

struct Session<'a, T: SmtpTransport> {
    transport: &'a mut T,
    deadline: Deadline,
    events: Vec<SmtpEvent>,
    open: bool,
}

impl<T: SmtpTransport> Session<'_, T> {
    fn converse(
        &mut self,
        host: &str,
        sender: &EmailAddress,
        recipient: &EmailAddress,
        options: &ProbeOptions,
    ) -> Step<ProbeOutcome> {
        let banner = self.read(Stage::Connect)?;
        if banner.is_failure() {
            return Err(ProbeOutcome::from_reply(Stage::Connect, &banner));
        }

        let helo = options.helo_host();
        let greeting = self.hello(&helo)?;
        if !options.skip_tls && greeting.has_capability("STARTTLS") && self.starttls(host)? {
            self.hello(&helo)?;
        }

        let mail = self.exchange(Stage::MailFrom, &format!("MAIL FROM:<{}>", sender.ace()))?;
        if mail.is_failure() {
            return Err(ProbeOutcome::from_reply(Stage::MailFrom, &mail));
        }

        let rcpt = self.exchange(Stage::RcptTo, &format!("RCPT TO:<{}>", recipient.ace()))?;
        Ok(classify_rcpt(&rcpt))
    }

    /// `EHLO`, then `HELO` if the server refuses it. Returns the reply of the
    /// greeting that succeeded; only an `EHLO` reply carries capabilities.
    fn hello(&mut self, helo: &str) -> Step<SmtpReply> {
        let ehlo = self.exchange(Stage::Helo, &format!("EHLO {helo}"))?;
        if ehlo.is_positive_completion() {
            return Ok(ehlo);
        }
        debug!(code = ehlo.code, "EHLO refused, falling back to HELO");
        let reply = self.exchange(Stage::Helo, &format!("HELO {helo}"))?;
        if reply.is_positive_completion() {
            Ok(SmtpReply::new(reply.code, reply.text()))
        } else {
            Err(ProbeOutcome::from_reply(Stage::Helo, &reply))
        }
    }

    /// Returns `Ok(true)` once the connection is encrypted and `Ok(false)`
    /// when the conversation should carry on in plaintext.
    fn starttls(&mut self, host: &str) -> Step<bool> {
        if !self.transport.tls_available() {
            debug!(host, "STARTTLS advertised but no TLS support; continuing in plaintext");
            return Ok(false);
        }
        let reply = self.exchange(Stage::StartTls, "STARTTLS")?;
        if !reply.is_positive_completion() {
            debug!(host, code = reply.code, "STARTTLS refused; continuing in plaintext");
            return Ok(false);
        }
        match self.transport.starttls(host) {
            Ok(()) => Ok(true),
            Err(err) => {
                self.record_error(Stage::StartTls, &err);
                self.open = false;
                let code = if err.is_tls_failure() {
                    TLS_FAILURE
                } else {
                    NO_REPLY
                };
                Err(ProbeOutcome::ambiguous(Stage::StartTls, code, err.to_string()))
            }
        }
    }

    fn exchange(&mut self, stage: Stage, command: &str) -> Step<SmtpReply> {
        self.arm(stage)?;
        self.events.push(SmtpEvent::Sent {
            stage,
            command: command.to_string(),
        });
        if let Err(err) = self.transport.send_command(command) {
            return Err(self.fail(stage, &err));
        }
        self.receive(stage)
    }

    fn read(&mut self, stage: Stage) -> Step<SmtpReply> {
        self.arm(stage)?;
        self.receive(stage)
    }

    fn receive(&mut self, stage: Stage) -> Step<SmtpReply> {
        match self.transport.read_reply() {
            Ok(reply) => {
                self.events.push(SmtpEvent::Received {
                    stage,
                    reply: reply.clone(),
                });
                Ok(reply)
            }
            Err(err) => Err(self.fail(stage, &err)),
        }
    }

    /// Bounds the next command by the time left on the probe.
    fn arm(&mut self, stage: Stage) -> Step<()> {
        let Some(remaining) = self.deadline.remaining() else {
            let err = TransportError::TimedOut;
            return Err(self.fail(stage, &err));
        };
        self.transport
            .set_timeout(remaining)
            .map_err(|err| self.fail(stage, &err))
    }

    fn fail(&mut self, stage: Stage, err: &TransportError) -> ProbeOutcome {
        self.record_error(stage, err);
        if matches!(err, TransportError::Closed) {
            self.open = false;
        }
        transport_outcome(stage, err)
    }

    fn record_error(&mut self, stage: Stage, err: &TransportError) {
        debug!(stage = %stage, error = %err, "SMTP step failed");
        self.events.push(SmtpEvent::Error {
            stage,
            message: err.to_string(),
        });
    }

    fn quit(&mut self) {
        if !self.open {
            return;
        }
        let timeout = self
            .deadline
            .remaining()
            .unwrap_or(QUIT_TIMEOUT_FLOOR)
            .clamp(QUIT_TIMEOUT_FLOOR, QUIT_TIMEOUT_CEILING);
        if self.transport.set_timeout(timeout).is_err() {
            return;
        }
        self.events.push(SmtpEvent::Sent {
            stage: Stage::Quit,
            command: "QUIT".to_string(),
        });
        if self.transport.send_command("QUIT").is_err() {
            return;
        }
        if let Ok(reply) = self.transport.read_reply() {
            self.events.push(SmtpEvent::Received {
                stage: Stage::Quit,
                reply,
            });
        }
    }
}
