use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::Parser;
use colored::*;
use futures::future::join_all;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use healthprobe::cli::Cli;
use healthprobe::output::OutputWriter;
use healthprobe::probes::{global_registry, ProbeError, ProbeReport, TestOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let registry = global_registry();

    if cli.list {
        for name in registry.names() {
            let probe = registry.create(name)?;
            println!("{}\n{}", name.bold(), probe.example());
        }
        return Ok(());
    }

    let protocol = match cli.protocol {
        Some(ref protocol) => protocol.clone(),
        None => bail!("no protocol given, run 'healthprobe --list' to see the available checks"),
    };
    // Fail on a bad protocol name before touching the network
    if !registry.contains(&protocol) {
        return Err(ProbeError::UnknownProtocol(protocol).into());
    }

    if cli.target.is_empty() {
        eprintln!("{}", "Error: No target specified.".red());
        eprintln!("Example: healthprobe -p smtp mail.example.com");
        std::process::exit(1);
    }

    let options = TestOptions {
        timeout: Duration::from_millis(cli.timeout),
    };

    // One fresh probe instance per target
    let tasks = cli.target.iter().map(|target| {
        let protocol = protocol.as_str();
        let line = cli.line.as_str();
        let options = &options;
        async move {
            let checked_at = chrono::Utc::now();
            let started = Instant::now();
            let outcome =
                healthprobe::probes::check(registry, protocol, line, options, target).await;
            debug!("{} {} finished in {:?}", protocol, target, started.elapsed());
            ProbeReport::new(target, protocol, &outcome, started.elapsed(), checked_at)
        }
    });
    let reports = join_all(tasks).await;

    let output_writer = OutputWriter::new(cli.output_format, cli.output_file.clone())?;
    output_writer.write(&reports)?;

    if reports.iter().any(|r| !r.success) {
        std::process::exit(2);
    }

    Ok(())
}
