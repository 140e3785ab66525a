use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use ts::{ContinuityMode, PID_NULL};

/// bitstream - inspect MPEG-2 transport streams and the tables they carry
#[derive(Parser, Debug)]
#[command(name = "bitstream", author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (defaults to ./bitstream.toml when present)
    #[arg(short = 'f', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every table as it completes, with its descriptors
    Dump {
        #[command(flatten)]
        input: InputArgs,

        /// Skip descriptor loops
        #[arg(long)]
        no_descriptors: bool,
    },

    /// Validate every table, failing when one is malformed
    Validate {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Count packets, resyncs and continuity errors
    Stats {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Show the configuration file after defaults are applied
    Config,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Transport stream file
    pub file: PathBuf,

    /// Extra PIDs carrying sections, decimal or 0x-prefixed hex
    #[arg(short, long, value_delimiter = ',', value_parser = parse_pid)]
    pub pids: Vec<u16>,

    /// Track the PAT and what it announces only, not the DVB SI PIDs
    #[arg(long)]
    pub no_dvb: bool,

    /// Do not decode ATSC A/52 descriptors
    #[arg(long)]
    pub no_atsc: bool,

    /// Continuity counter checking
    #[arg(long, value_enum)]
    pub continuity: Option<Continuity>,

    /// Bytes read from the file at a time
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Continuity {
    #[default]
    Off,
    Warn,
    Strict,
}

impl From<Continuity> for ContinuityMode {
    fn from(value: Continuity) -> Self {
        match value {
            Continuity::Off => ContinuityMode::Disabled,
            Continuity::Warn => ContinuityMode::Warn,
            Continuity::Strict => ContinuityMode::Strict,
        }
    }
}

/// A PID below the null PID.
pub fn parse_pid(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    }
    .map_err(|e| format!("invalid PID '{value}': {e}"))?;
    if parsed >= PID_NULL {
        return Err(format!("PID {parsed:#06x} out of range"));
    }
    Ok(parsed)
}
