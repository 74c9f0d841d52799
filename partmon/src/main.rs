// SPDX-License-Identifier: GPL-3.0-only

use std::io;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use nix::sys::signal::Signal;
use partmon_sys::{
    DeviceContext, LinePrinter, Shutdown, UdevMonitor, UdevRegistry, monitor_partitions,
    scan_partitions,
};
use tracing_subscriber::{EnvFilter, fmt};

/// Print block partition events as they happen
#[derive(Parser, Debug)]
#[command(name = "partmon", version)]
#[command(
    about = "List present block partitions, then print every partition add/remove/change event",
    long_about = None
)]
struct Args {
    /// Log more detail to stderr (repeat for trace output)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "partmon=info,partmon_sys=info,warn",
        1 => "partmon=debug,partmon_sys=debug,warn",
        _ => "partmon=trace,partmon_sys=trace,info",
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only event lines
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(args.verbose))),
        )
        .with_writer(io::stderr)
        .init();

    tracing::debug!("Starting partmon v{}", env!("CARGO_PKG_VERSION"));

    let mut shutdown = Shutdown::on_signals(&[Signal::SIGINT, Signal::SIGTERM])
        .context("cannot install signal handling")?;
    let context = DeviceContext::new().context("cannot create udev context")?;
    let mut printer = LinePrinter::new(io::stdout().lock());

    {
        let mut registry =
            UdevRegistry::partitions(&context).context("cannot scan partitions")?;
        scan_partitions(&mut registry, &mut printer).context("cannot scan partitions")?;
    }

    let mut monitor = UdevMonitor::partitions().context("cannot monitor partitions")?;
    let reason = monitor_partitions(&mut monitor, &mut shutdown, &mut printer)
        .context("cannot monitor partitions")?;
    tracing::debug!("Partition monitor stopped: {reason:?}");

    Ok(())
}
