use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpListener;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use super::probe::classify_rcpt;
use super::transport::{self, ReplyReader};
use super::*;
use crate::address::EmailAddress;
use crate::mx::AddressFamilies;

/// One scripted server action, consumed by each `read_reply`.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Reply text, lines separated by `\n` (e.g. `"250-mx\n250 STARTTLS"`).
    Reply(&'static str),
    /// The peer hangs up.
    Hangup,
    /// The read times out.
    Stall,
    /// The reply arrives only after the wall clock has moved on.
    Delayed(Duration, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum TlsMode {
    #[default]
    Unsupported,
    Succeeds,
    Fails,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct HostScript {
    pub refuse_connect: bool,
    pub tls: TlsMode,
    pub steps: Vec<Step>,
}

impl HostScript {
    pub(crate) fn replies(steps: &[Step]) -> Self {
        Self {
            steps: steps.to_vec(),
            tls: TlsMode::Succeeds,
            ..Self::default()
        }
    }

    pub(crate) fn refused() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    /// A plain server answering every command and the recipient with `rcpt`.
    pub(crate) fn answering(rcpt: &'static str) -> Self {
        Self::replies(&[
            Step::Reply("220 mx ready"),
            Step::Reply("250 mx"),
            Step::Reply("250 ok"),
            Step::Reply(rcpt),
            Step::Reply("221 bye"),
        ])
    }
}

#[derive(Debug, Default)]
pub(crate) struct Log {
    pub connects: Vec<String>,
    /// Connect budget handed to each host, in connection order.
    pub timeouts: Vec<(String, Duration)>,
    pub commands: Vec<(String, String)>,
    pub tls: Vec<String>,
    pub closed: Vec<String>,
}

impl Log {
    pub(crate) fn commands_for(&self, host: &str) -> Vec<String> {
        self.commands
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, command)| command.clone())
            .collect()
    }
}

/// Hands out scripted transports; hosts without a script refuse connections.
#[derive(Default)]
pub(crate) struct ScriptedConnector {
    scripts: RefCell<HashMap<String, HostScript>>,
    pub log: Rc<RefCell<Log>>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn host(self, name: &str, script: HostScript) -> Self {
        self.scripts.borrow_mut().insert(name.to_string(), script);
        self
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self, host: &str, timeout: Duration) -> Result<ScriptedTransport, TransportError> {
        {
            let mut log = self.log.borrow_mut();
            log.connects.push(host.to_string());
            log.timeouts.push((host.to_string(), timeout));
        }
        match self.scripts.borrow_mut().remove(host) {
            Some(script) if !script.refuse_connect => Ok(ScriptedTransport {
                host: host.to_string(),
                steps: script.steps.into(),
                tls: script.tls,
                log: Rc::clone(&self.log),
                hung_up: false,
            }),
            _ => Err(TransportError::connect(
                host,
                io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
        }
    }
}

pub(crate) struct ScriptedTransport {
    host: String,
    steps: VecDeque<Step>,
    tls: TlsMode,
    log: Rc<RefCell<Log>>,
    hung_up: bool,
}

impl SmtpTransport for ScriptedTransport {
    fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        if self.hung_up {
            return Err(TransportError::Closed);
        }
        self.log
            .borrow_mut()
            .commands
            .push((self.host.clone(), command.to_string()));
        Ok(())
    }

    fn read_reply(&mut self) -> Result<SmtpReply, TransportError> {
        match self.steps.pop_front() {
            Some(Step::Reply(text)) => Ok(parse_reply(text)),
            Some(Step::Stall) => Err(TransportError::TimedOut),
            Some(Step::Delayed(delay, text)) => {
                thread::sleep(delay);
                Ok(parse_reply(text))
            }
            Some(Step::Hangup) | None => {
                self.hung_up = true;
                Err(TransportError::Closed)
            }
        }
    }

    fn tls_available(&self) -> bool {
        self.tls != TlsMode::Unsupported
    }

    fn starttls(&mut self, host: &str) -> Result<(), TransportError> {
        match self.tls {
            TlsMode::Succeeds => {
                self.log.borrow_mut().tls.push(host.to_string());
                Ok(())
            }
            TlsMode::Fails => Err(TransportError::TlsStalled),
            TlsMode::Unsupported => Err(TransportError::TlsUnavailable("scripted".into())),
        }
    }

    fn set_timeout(&mut self, _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) {
        self.log.borrow_mut().closed.push(self.host.clone());
    }
}

fn parse_reply(text: &str) -> SmtpReply {
    let mut reader = ReplyReader::default();
    for line in text.split('\n') {
        if let Some(reply) = reader.push(line).expect("well-formed scripted reply") {
            return reply;
        }
    }
    panic!("scripted reply {text:?} has no final line");
}

fn addr(raw: &str) -> EmailAddress {
    EmailAddress::parse(raw).expect("valid test address")
}

fn run(connector: &ScriptedConnector, options: &ProbeOptions) -> ProbeReport {
    let recipient = addr("user@example.com");
    probe(
        connector,
        "mx.example.com",
        &recipient,
        &recipient,
        options,
        Duration::from_secs(5),
    )
}

fn ambiguous(stage: Stage, code: i32) -> impl Fn(&ProbeOutcome) -> bool {
    move |outcome: &ProbeOutcome| {
        matches!(outcome, ProbeOutcome::Ambiguous { stage: s, code: c, .. } if *s == stage && *c == code)
    }
}

#[test]
fn accepted_recipient_runs_full_conversation() {
    let connector = ScriptedConnector::new().host("mx.example.com", HostScript::answering("250 ok"));
    let report = run(&connector, &ProbeOptions::default());

    assert!(report.outcome.is_accepted());
    let log = connector.log.borrow();
    assert_eq!(
        log.commands_for("mx.example.com"),
        vec![
            "EHLO localhost",
            "MAIL FROM:<user@example.com>",
            "RCPT TO:<user@example.com>",
            "QUIT",
        ]
    );
    assert_eq!(log.closed, vec!["mx.example.com"]);
}

#[test]
fn permanent_rcpt_failure_is_rejected() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        HostScript::answering("550 5.1.1 no such user"),
    );
    let report = run(&connector, &ProbeOptions::default());
    assert_eq!(
        report.outcome,
        ProbeOutcome::Rejected {
            code: 550,
            text: "5.1.1 no such user".into()
        }
    );
}

#[test]
fn transient_rcpt_failure_is_ambiguous() {
    let connector = ScriptedConnector::new()
        .host("mx.example.com", HostScript::answering("451 greylisted"));
    let report = run(&connector, &ProbeOptions::default());
    assert!(ambiguous(Stage::RcptTo, 451)(&report.outcome));
}

#[test]
fn rcpt_codes_classify_by_range() {
    let outcome = |code| classify_rcpt(&SmtpReply::new(code, "x"));
    assert!(ambiguous(Stage::RcptTo, 199)(&outcome(199)));
    assert!(outcome(200).is_accepted());
    assert!(outcome(251).is_accepted());
    assert!(outcome(399).is_accepted());
    assert!(ambiguous(Stage::RcptTo, 400)(&outcome(400)));
    assert!(ambiguous(Stage::RcptTo, 499)(&outcome(499)));
    assert!(matches!(outcome(500), ProbeOutcome::Rejected { code: 500, .. }));
    assert!(matches!(outcome(554), ProbeOutcome::Rejected { code: 554, .. }));
}

#[test]
fn reply_classes_partition_failures() {
    let reply = |code| SmtpReply::new(code, "x");
    assert!(reply(250).is_positive_completion());
    assert!(!reply(354).is_failure());
    assert!(reply(421).is_transient_failure());
    assert!(!reply(421).is_permanent_failure());
    assert!(reply(421).is_failure());
    assert!(reply(550).is_permanent_failure());
    assert!(!reply(550).is_transient_failure());
    assert!(reply(550).is_failure());
}

#[test]
fn refused_connection_is_ambiguous_without_reply() {
    let connector = ScriptedConnector::new().host("mx.example.com", HostScript::refused());
    let report = run(&connector, &ProbeOptions::default());
    assert!(ambiguous(Stage::Connect, 0)(&report.outcome));
    assert!(matches!(
        report.events.as_slice(),
        [SmtpEvent::Error {
            stage: Stage::Connect,
            ..
        }]
    ));
}

#[test]
fn hostile_banner_stops_but_still_quits() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        HostScript::replies(&[Step::Reply("554 go away"), Step::Reply("221 bye")]),
    );
    let report = run(&connector, &ProbeOptions::default());

    assert_eq!(
        report.outcome,
        ProbeOutcome::Ambiguous {
            stage: Stage::Connect,
            code: 554,
            text: "go away".into()
        }
    );
    let log = connector.log.borrow();
    assert_eq!(log.commands_for("mx.example.com"), vec!["QUIT"]);
    assert_eq!(log.closed.len(), 1);
}

#[test]
fn ehlo_refusal_falls_back_to_helo() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        HostScript::replies(&[
            Step::Reply("220 old server"),
            Step::Reply("502 command not implemented"),
            Step::Reply("250 hello"),
            Step::Reply("250 ok"),
            Step::Reply("250 ok"),
            Step::Reply("221 bye"),
        ]),
    );
    let report = run(&connector, &ProbeOptions::default());

    assert!(report.outcome.is_accepted());
    let commands = connector.log.borrow().commands_for("mx.example.com");
    assert_eq!(&commands[..2], ["EHLO localhost", "HELO localhost"]);
}

#[test]
fn helo_refusal_is_ambiguous() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        HostScript::replies(&[
            Step::Reply("220 picky"),
            Step::Reply("500 no"),
            Step::Reply("501 still no"),
            Step::Reply("221 bye"),
        ]),
    );
    let report = run(&connector, &ProbeOptions::default());
    assert!(ambiguous(Stage::Helo, 501)(&report.outcome));
}

fn starttls_server(after_tls: &[Step]) -> HostScript {
    let mut steps = vec![
        Step::Reply("220 secure mx"),
        Step::Reply("250-mx.example.com\n250-SIZE 1000\n250 STARTTLS"),
    ];
    steps.extend_from_slice(after_tls);
    HostScript::replies(&steps)
}

#[test]
fn advertised_starttls_upgrades_and_greets_again() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        starttls_server(&[
            Step::Reply("220 go ahead"),
            Step::Reply("250 mx.example.com"),
            Step::Reply("250 ok"),
            Step::Reply("250 ok"),
            Step::Reply("221 bye"),
        ]),
    );
    let report = run(&connector, &ProbeOptions::default());

    assert!(report.outcome.is_accepted());
    let log = connector.log.borrow();
    assert_eq!(log.tls, vec!["mx.example.com"]);
    assert_eq!(
        &log.commands_for("mx.example.com")[..3],
        ["EHLO localhost", "STARTTLS", "EHLO localhost"]
    );
}

#[test]
fn skip_tls_never_sends_starttls() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        starttls_server(&[
            Step::Reply("250 ok"),
            Step::Reply("250 ok"),
            Step::Reply("221 bye"),
        ]),
    );
    let options = ProbeOptions {
        skip_tls: true,
        ..ProbeOptions::default()
    };
    let report = run(&connector, &options);

    assert!(report.outcome.is_accepted());
    let commands = connector.log.borrow().commands_for("mx.example.com");
    assert!(!commands.iter().any(|c| c == "STARTTLS"));
}

#[test]
fn refused_starttls_continues_in_plaintext() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        starttls_server(&[
            Step::Reply("454 TLS not available"),
            Step::Reply("250 ok"),
            Step::Reply("550 unknown"),
            Step::Reply("221 bye"),
        ]),
    );
    let report = run(&connector, &ProbeOptions::default());

    assert!(matches!(report.outcome, ProbeOutcome::Rejected { code: 550, .. }));
    assert!(connector.log.borrow().tls.is_empty());
}

#[test]
fn starttls_without_local_support_continues_in_plaintext() {
    let mut script = starttls_server(&[
        Step::Reply("250 ok"),
        Step::Reply("250 ok"),
        Step::Reply("221 bye"),
    ]);
    script.tls = TlsMode::Unsupported;
    let connector = ScriptedConnector::new().host("mx.example.com", script);
    let report = run(&connector, &ProbeOptions::default());

    assert!(report.outcome.is_accepted());
    let commands = connector.log.borrow().commands_for("mx.example.com");
    assert!(!commands.iter().any(|c| c == "STARTTLS"));
}

#[test]
fn failed_tls_handshake_aborts_the_host() {
    let mut script = starttls_server(&[Step::Reply("220 go ahead")]);
    script.tls = TlsMode::Fails;
    let connector = ScriptedConnector::new().host("mx.example.com", script);
    let report = run(&connector, &ProbeOptions::default());

    assert!(ambiguous(Stage::StartTls, -1)(&report.outcome));
    let log = connector.log.borrow();
    let commands = log.commands_for("mx.example.com");
    assert_eq!(commands.last().map(String::as_str), Some("STARTTLS"));
    assert_eq!(log.closed.len(), 1);
}

#[test]
fn sender_refusal_is_ambiguous() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        HostScript::replies(&[
            Step::Reply("220 mx"),
            Step::Reply("250 mx"),
            Step::Reply("553 sender rejected"),
            Step::Reply("221 bye"),
        ]),
    );
    let report = run(&connector, &ProbeOptions::default());
    assert!(ambiguous(Stage::MailFrom, 553)(&report.outcome));
    let commands = connector.log.borrow().commands_for("mx.example.com");
    assert!(!commands.iter().any(|c| c.starts_with("RCPT TO")));
}

#[test]
fn disconnect_reports_last_stage_and_skips_quit() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        HostScript::replies(&[
            Step::Reply("220 mx"),
            Step::Reply("250 mx"),
            Step::Reply("250 ok"),
            Step::Hangup,
        ]),
    );
    let report = run(&connector, &ProbeOptions::default());

    assert!(ambiguous(Stage::RcptTo, 0)(&report.outcome));
    let log = connector.log.borrow();
    assert_eq!(
        log.commands_for("mx.example.com").last().map(String::as_str),
        Some("RCPT TO:<user@example.com>")
    );
    assert_eq!(log.closed.len(), 1);
}

#[test]
fn stalled_command_times_out_at_its_stage() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        HostScript::replies(&[Step::Reply("220 mx"), Step::Reply("250 mx"), Step::Stall]),
    );
    let report = run(&connector, &ProbeOptions::default());
    assert_eq!(
        report.outcome,
        ProbeOutcome::Ambiguous {
            stage: Stage::MailFrom,
            code: 0,
            text: "timed out".into()
        }
    );
}

#[test]
fn spent_budget_times_out_before_the_banner() {
    let connector = ScriptedConnector::new().host("mx.example.com", HostScript::answering("250 ok"));
    let recipient = addr("user@example.com");
    let report = probe(
        &connector,
        "mx.example.com",
        &recipient,
        &recipient,
        &ProbeOptions::default(),
        Duration::ZERO,
    );
    assert_eq!(
        report.outcome,
        ProbeOutcome::Ambiguous {
            stage: Stage::Connect,
            code: 0,
            text: "timed out".into()
        }
    );
    assert_eq!(connector.log.borrow().closed.len(), 1);
}

#[test]
fn commands_use_ascii_addresses_and_configured_helo() {
    let connector = ScriptedConnector::new().host("mx.example.com", HostScript::answering("250 ok"));
    let options = ProbeOptions {
        helo_host: Some("probe.example.net".into()),
        ..ProbeOptions::default()
    };
    let report = probe(
        &connector,
        "mx.example.com",
        &addr("verifier@example.net"),
        &addr("jörg@exämple.com"),
        &options,
        Duration::from_secs(5),
    );

    assert!(report.outcome.is_accepted());
    assert_eq!(
        &connector.log.borrow().commands_for("mx.example.com")[..3],
        [
            "EHLO probe.example.net",
            "MAIL FROM:<verifier@example.net>",
            "RCPT TO:<jörg@xn--exmple-cua.com>",
        ]
    );
}

#[test]
fn blank_helo_host_falls_back_to_default() {
    let options = ProbeOptions {
        helo_host: Some("   ".into()),
        ..ProbeOptions::default()
    };
    assert_eq!(options.helo_host(), DEFAULT_HELO_HOST);
}

#[test]
fn multiline_reply_is_collected() {
    let reply = parse_reply("250-mx.example.com greets you\n250-PIPELINING\n250 starttls");
    assert_eq!(reply.code, 250);
    assert_eq!(reply.lines.len(), 3);
    assert!(reply.has_capability("STARTTLS"));
    assert!(reply.has_capability("pipelining"));
}

#[test]
fn greeting_line_is_not_a_capability() {
    let reply = parse_reply("250-STARTTLS.example.com\n250 SIZE 1000");
    assert!(!reply.has_capability("STARTTLS.example.com"));
    assert!(!reply.has_capability("STARTTLS"));
    assert!(reply.has_capability("SIZE"));
}

#[test]
fn malformed_reply_lines_are_protocol_errors() {
    let mut reader = ReplyReader::default();
    assert!(matches!(reader.push("hello"), Err(TransportError::Protocol(_))));

    let mut reader = ReplyReader::default();
    assert!(reader.push("250-first").expect("valid line").is_none());
    assert!(matches!(reader.push("251 second"), Err(TransportError::Protocol(_))));
}

#[test]
fn bare_code_reply_has_empty_text() {
    let reply = parse_reply("250");
    assert_eq!(reply.code, 250);
    assert_eq!(reply.text(), "");
}

#[test]
fn transcript_events_render_for_humans() {
    let connector = ScriptedConnector::new().host(
        "mx.example.com",
        HostScript::answering("550 no such user"),
    );
    let report = run(&connector, &ProbeOptions::default());
    let rendered: Vec<String> = report.events.iter().map(ToString::to_string).collect();
    insta::assert_snapshot!(rendered.join("\n"), @r"
    S: 220 mx ready
    C: EHLO localhost
    S: 250 mx
    C: MAIL FROM:<user@example.com>
    S: 250 ok
    C: RCPT TO:<user@example.com>
    S: 550 no such user
    C: QUIT
    S: 221 bye
    ");
}

fn spawn_mock_server(script: Vec<(&'static str, &'static str)>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("local addr").port();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut writer = stream.try_clone().expect("clone stream");
        let mut reader = BufReader::new(stream);
        writer.write_all(b"220 mock ESMTP\r\n").expect("banner");
        for (expected_prefix, reply) in script {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                return;
            }
            assert!(
                line.starts_with(expected_prefix),
                "expected {expected_prefix}, got {line}"
            );
            writer.write_all(reply.as_bytes()).expect("reply");
        }
    });
    port
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn tcp_transport_talks_to_loopback_server() {
    let port = spawn_mock_server(vec![
        ("EHLO", "250-localhost\r\n250 SIZE 1000\r\n"),
        ("MAIL FROM", "250 ok\r\n"),
        ("RCPT TO", "550 5.1.1 unknown\r\n"),
        ("QUIT", "221 bye\r\n"),
    ]);
    let connector = TcpConnector::plaintext(port, AddressFamilies::IPV4_ONLY);
    let recipient = addr("nobody@example.com");
    let report = probe(
        &connector,
        "127.0.0.1",
        &recipient,
        &recipient,
        &ProbeOptions::default(),
        Duration::from_secs(5),
    );
    assert!(matches!(report.outcome, ProbeOutcome::Rejected { code: 550, .. }));
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn tcp_connector_honors_address_families() {
    let port = spawn_mock_server(Vec::new());
    let connector = TcpConnector::plaintext(port, AddressFamilies::IPV6_ONLY);
    let err = connector
        .connect("127.0.0.1", Duration::from_secs(1))
        .expect_err("IPv4 address must be filtered out");
    assert!(matches!(err, TransportError::NoAddress { .. }));
}

#[test]
fn literal_hosts_skip_the_resolver() {
    assert_eq!(
        transport::literal_ip("192.0.2.7"),
        Some("192.0.2.7".parse().expect("ip"))
    );
    assert_eq!(
        transport::literal_ip("[2001:db8::1]"),
        Some("2001:db8::1".parse().expect("ip"))
    );
    assert_eq!(transport::literal_ip("mx.example.com"), None);
}

#[test]
fn host_addresses_are_filtered_by_family() {
    let ips: Vec<std::net::IpAddr> = vec![
        "192.0.2.7".parse().expect("ip"),
        "2001:db8::1".parse().expect("ip"),
    ];
    let v6 = transport::usable_addrs("mx", ips.clone(), 2525, AddressFamilies::IPV6_ONLY)
        .expect("one IPv6 address");
    assert_eq!(v6, vec!["[2001:db8::1]:2525".parse().expect("socket addr")]);

    let both = transport::usable_addrs("mx", ips.clone(), 25, AddressFamilies::BOTH)
        .expect("both addresses");
    assert_eq!(both.len(), 2);

    let err = transport::usable_addrs("mx", ips[..1].to_vec(), 25, AddressFamilies::IPV6_ONLY)
        .expect_err("IPv4 only host");
    assert!(matches!(err, TransportError::NoAddress { host } if host == "mx"));
}

#[test]
fn lookup_strategy_follows_address_families() {
    use trust_dns_resolver::config::LookupIpStrategy;
    assert_eq!(
        transport::lookup_strategy(AddressFamilies::IPV4_ONLY),
        LookupIpStrategy::Ipv4Only
    );
    assert_eq!(
        transport::lookup_strategy(AddressFamilies::IPV6_ONLY),
        LookupIpStrategy::Ipv6Only
    );
    assert_eq!(
        transport::lookup_strategy(AddressFamilies::BOTH),
        LookupIpStrategy::Ipv4AndIpv6
    );
}

/// Accepts one connection and feeds it `chunk` every `interval`, never ending
/// the line, until the client goes away or `limit` chunks were sent.
fn spawn_trickling_server(chunk: &'static [u8], interval: Duration, limit: usize) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind trickling server");
    let port = listener.local_addr().expect("local addr").port();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        for _ in 0..limit {
            if stream.write_all(chunk).is_err() {
                return;
            }
            thread::sleep(interval);
        }
    });
    port
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn trickled_banner_cannot_outlast_the_budget() {
    let port = spawn_trickling_server(b"2", Duration::from_millis(200), 50);
    let connector = TcpConnector::plaintext(port, AddressFamilies::IPV4_ONLY);
    let recipient = addr("nobody@example.com");
    let started = Instant::now();
    let report = probe(
        &connector,
        "127.0.0.1",
        &recipient,
        &recipient,
        &ProbeOptions::default(),
        Duration::from_secs(1),
    );
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_millis(2500), "took {elapsed:?}");
    assert!(
        matches!(
            &report.outcome,
            ProbeOutcome::Ambiguous { stage: Stage::Connect, code: 0, text } if text.contains("timed out")
        ),
        "{:?}",
        report.outcome
    );
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn endless_reply_line_is_a_protocol_error() {
    static CHUNK: [u8; 1024] = [b'2'; 1024];
    let port = spawn_trickling_server(&CHUNK, Duration::from_millis(1), 64);
    let connector = TcpConnector::plaintext(port, AddressFamilies::IPV4_ONLY);
    let mut transport = connector
        .connect("127.0.0.1", Duration::from_secs(5))
        .expect("loopback connect");
    let err = transport.read_reply().expect_err("line never ends");
    assert!(matches!(err, TransportError::Protocol(ref message) if message.contains("exceeds")));
}
