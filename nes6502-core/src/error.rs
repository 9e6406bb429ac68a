//! Error handling.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    #[error("invalid PRG-ROM size ${size:04X} (expected a non-empty multiple of $4000)")]
    InvalidPrgRom { size: usize },
    #[error("invalid configuration {value:?} for {field:?}")]
    InvalidConfig { field: &'static str, value: String },
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("control deck is powered off")]
    PoweredOff,
    #[error("{context}: {source:?}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_config(field: &'static str, value: impl ToString) -> Self {
        Self::InvalidConfig {
            field,
            value: value.to_string(),
        }
    }
}
