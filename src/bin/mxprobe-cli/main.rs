mod args;
mod check;
mod mx;
mod output;

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_directive());

    if let Some(Commands::Mx { domain }) = &cli.cmd {
        let summary = mx::resolve(domain, cli.dns_timeout());
        output::write_mx(&summary, cli.format)?;
        std::process::exit(summary.exit_code());
    }

    let options = cli.validation_options()?;
    let mut rows = Vec::new();
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(check::check(&line, &options, cli.transcript));
        }
    } else if let Some(Commands::Check { email }) = &cli.cmd {
        rows.push(check::check(email, &options, cli.transcript));
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    output::write_checks(&rows, cli.format)?;

    // 0 deliverable, 2 undeliverable, 3 unknown, 1 fatal
    let code = check::exit_code(&rows);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_tracing(default_directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(io::stderr)
        .init();
}
