//! pcapidx CLI entry point.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pcapidx::capture::{list_interfaces, CaptureSource};
use pcapidx::cli::{close_on_signal, Args, RecordWriter};
use pcapidx::counter::{AtomicCounter, ProgressLog};
use pcapidx::pipeline;
use pcapidx::source::RecordSource;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = args.log_level();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    if args.list_interfaces {
        return print_interfaces();
    }

    let config = args.to_config()?;
    let capture = CaptureSource::open(&config.capture)
        .with_context(|| format!("Failed to open {}", config.capture.source.describe()))?;
    close_on_signal(capture.close_handle()).context("Failed to install signal handlers")?;

    // Sampled progress logs are emitted at info level
    let progress = ProgressLog::new(config.debug);
    let source = RecordSource::new(capture, Arc::new(AtomicCounter::new()), progress);

    let output: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let sink = RecordWriter::new(args.format, output);

    let summary = pipeline::run(&source, config.workers, &sink)?;
    sink.flush().context("Failed to flush output")?;

    info!(
        records = summary.records,
        decode_errors = summary.decode_errors,
        "capture finished"
    );
    Ok(())
}

fn print_interfaces() -> Result<()> {
    let interfaces = list_interfaces().context("Failed to list capture interfaces")?;

    println!("Capture Interfaces:");
    println!("{:-<50}", "");

    for interface in interfaces {
        match &interface.description {
            Some(desc) => println!("  {} ({desc})", interface.name),
            None => println!("  {}", interface.name),
        }
        for addr in &interface.addresses {
            println!("    {addr}");
        }
    }
    Ok(())
}
