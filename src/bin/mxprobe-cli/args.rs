use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use mxprobe::{
    AddressFamilies, Blocklist, CheckOptions, DomainListChecker, ProbeOptions, ValidationOptions,
};

#[derive(Parser)]
#[command(name = "mxprobe-cli", version, about = "Checks whether email addresses can receive mail")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// read addresses from stdin, one per line
    #[arg(long)]
    pub stdin: bool,

    /// envelope sender for MAIL FROM (defaults to the checked address)
    #[arg(long, env = "MXPROBE_FROM", global = true)]
    pub from: Option<String>,

    /// identity sent with EHLO/HELO
    #[arg(long, env = "MXPROBE_HELO", global = true)]
    pub helo: Option<String>,

    /// per-query DNS timeout (ms)
    #[arg(long, env = "MXPROBE_DNS_TIMEOUT_MS", default_value_t = 10_000, global = true)]
    pub dns_timeout_ms: u64,

    /// total SMTP budget per address (ms)
    #[arg(long, env = "MXPROBE_SMTP_TIMEOUT_MS", default_value_t = 10_000, global = true)]
    pub smtp_timeout_ms: u64,

    /// SMTP port
    #[arg(long, env = "MXPROBE_PORT", default_value_t = mxprobe::smtp::DEFAULT_SMTP_PORT, global = true)]
    pub port: u16,

    /// stop after MX resolution
    #[arg(long, env = "MXPROBE_SKIP_SMTP", global = true)]
    pub skip_smtp: bool,

    /// never negotiate STARTTLS
    #[arg(long, env = "MXPROBE_SKIP_TLS", global = true)]
    pub skip_tls: bool,

    /// connect over IPv4 only
    #[arg(long, conflicts_with = "ipv6_only", global = true)]
    pub ipv4_only: bool,

    /// connect over IPv6 only
    #[arg(long, global = true)]
    pub ipv6_only: bool,

    /// extra deny-list file, one domain per line
    #[arg(long, env = "MXPROBE_BLOCKLIST", global = true)]
    pub blocklist: Option<PathBuf>,

    /// skip the syntax check
    #[arg(long, global = true)]
    pub no_syntax: bool,

    /// output format
    #[arg(long, value_enum, env = "MXPROBE_FORMAT", default_value_t = Format::Human, global = true)]
    pub format: Format,

    /// print the SMTP conversation of every probed host
    #[arg(long, global = true)]
    pub transcript: bool,

    /// more logging on stderr (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full validation of one address
    Check { email: String },
    /// MX resolution of a domain only
    Mx { domain: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
    Ndjson,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    pub fn families(&self) -> AddressFamilies {
        if self.ipv4_only {
            AddressFamilies::IPV4_ONLY
        } else if self.ipv6_only {
            AddressFamilies::IPV6_ONLY
        } else {
            AddressFamilies::BOTH
        }
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn validation_options(&self) -> Result<ValidationOptions> {
        if self.dns_timeout_ms == 0 {
            bail!("--dns-timeout-ms must be greater than zero");
        }

        let mut domain_list = DomainListChecker::default();
        if let Some(path) = &self.blocklist {
            let list = Blocklist::load(path)
                .with_context(|| format!("load blocklist {}", path.display()))?;
            domain_list = domain_list.with_blocklist(&list);
        }

        let probe = ProbeOptions {
            port: self.port,
            helo_host: self.helo.clone(),
            skip_tls: self.skip_tls,
            families: self.families(),
        };
        let check = CheckOptions {
            dns_timeout: self.dns_timeout(),
            smtp_timeout: Duration::from_millis(self.smtp_timeout_ms),
            skip_smtp: self.skip_smtp,
            probe,
        };

        Ok(ValidationOptions {
            check_syntax: !self.no_syntax,
            sender: self.from.clone(),
            domain_list,
            check,
            ..ValidationOptions::default()
        })
    }
}
