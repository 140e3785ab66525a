use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport stream error: {0}")]
    Ts(#[from] ts::TsError),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} malformed table(s)")]
    Malformed(usize),
}

pub type Result<T> = std::result::Result<T, AppError>;
