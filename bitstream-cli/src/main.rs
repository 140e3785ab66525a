mod analyzer;
mod cli;
mod config;
mod error;
mod output;

use std::fs::File;
use std::io::{self, Write};
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    analyzer::{Analyzer, Summary},
    cli::{Args, Commands, InputArgs},
    config::{ConfigFile, Settings},
    error::AppError,
    output::TableReport,
};

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("Application error: {:#}", e);
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = ConfigFile::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(args.verbose, args.quiet, config.logging.level.as_deref())?;

    let mut out = io::stdout().lock();
    match args.command {
        Commands::Dump {
            input,
            no_descriptors,
        } => {
            let summary = analyze(&config, &input, !no_descriptors, |report| {
                write!(out, "{report}")?;
                Ok(())
            })?;
            print_summary(&mut out, &summary)?;
        }

        Commands::Validate { input } => {
            let summary = analyze(&config, &input, false, |report| {
                if !report.valid {
                    write!(out, "{report}")?;
                }
                Ok(())
            })?;
            print_summary(&mut out, &summary)?;
            if summary.malformed > 0 {
                return Err(AppError::Malformed(summary.malformed).into());
            }
        }

        Commands::Stats { input } => {
            let summary = analyze(&config, &input, false, |_| Ok(()))?;
            print_summary(&mut out, &summary)?;
        }

        Commands::Config => {
            writeln!(out, "{config:#?}")?;
        }
    }
    Ok(())
}

fn analyze<F>(
    config: &ConfigFile,
    input: &InputArgs,
    descriptors: bool,
    on_report: F,
) -> anyhow::Result<Summary>
where
    F: FnMut(&TableReport) -> error::Result<()>,
{
    let settings = Settings::merge(&config.input, input)?;
    let file = File::open(&input.file)
        .with_context(|| format!("Failed to open {}", input.file.display()))?;
    let mut analyzer = Analyzer::new(&settings, descriptors);
    Ok(analyzer.run(file, on_report)?)
}

fn print_summary(out: &mut impl Write, summary: &Summary) -> io::Result<()> {
    let stats = &summary.stats;
    writeln!(
        out,
        "packets {} (resyncs {}, skipped bytes {}, transport errors {})",
        stats.packets, stats.resyncs, stats.skipped_bytes, stats.transport_errors
    )?;
    writeln!(
        out,
        "continuity: {} discontinuities, {} duplicates",
        stats.discontinuities, stats.duplicates
    )?;
    writeln!(
        out,
        "tables {} ({} malformed)",
        summary.tables, summary.malformed
    )
}

fn init_logging(verbose: bool, quiet: bool, level: Option<&str>) -> anyhow::Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else if let Some(level) = level {
        EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'"))?
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    subscriber
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(io::stderr),
        )
        .init();
    Ok(())
}
