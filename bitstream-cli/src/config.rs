use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use ts::{PID_NULL, PacketFormat, TS_PACKET_SIZE};

use crate::cli::{Continuity, InputArgs};
use crate::error::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "bitstream.toml";
pub const DEFAULT_CHUNK_SIZE: usize = TS_PACKET_SIZE * 1024;

/// Configuration file format.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub input: InputSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct InputSection {
    pub chunk_size: Option<usize>,
    pub continuity: Option<Continuity>,
    /// Extra section PIDs, added to those given on the command line.
    pub pids: Option<Vec<u16>>,
    pub dvb: Option<bool>,
    pub atsc: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct LoggingSection {
    /// `EnvFilter` directives used when neither `-v` nor `-q` is given.
    pub level: Option<String>,
}

impl ConfigFile {
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Explicit path > ./bitstream.toml > defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };
        let contents = std::fs::read_to_string(&path)?;
        let config = Self::parse(&contents)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Input settings after merging the config file with the command line.
/// Command line flags take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub chunk_size: usize,
    pub continuity: Continuity,
    pub pids: Vec<u16>,
    pub dvb: bool,
    pub atsc: bool,
}

impl Settings {
    pub fn merge(file: &InputSection, args: &InputArgs) -> Result<Self> {
        let chunk_size = args
            .chunk_size
            .or(file.chunk_size)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        let min = PacketFormat::Ts204.packet_size();
        if chunk_size < min {
            return Err(AppError::InvalidInput(format!(
                "chunk size {chunk_size} is below one packet ({min} bytes)"
            )));
        }

        let mut pids = args.pids.clone();
        for &pid in file.pids.iter().flatten() {
            if pid >= PID_NULL {
                return Err(AppError::InvalidInput(format!("PID {pid:#06x} out of range")));
            }
            if !pids.contains(&pid) {
                pids.push(pid);
            }
        }

        Ok(Self {
            chunk_size,
            continuity: args.continuity.or(file.continuity).unwrap_or_default(),
            pids,
            dvb: !args.no_dvb && file.dvb.unwrap_or(true),
            atsc: !args.no_atsc && file.atsc.unwrap_or(true),
        })
    }
}
