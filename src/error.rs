use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("impossible to access {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("impossible to read table {table:?}: {source}")]
    CsvError {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("impossible to write the echo of table {table:?}: {source}")]
    EchoError {
        table: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Row of table {table:?} has no {field:?} column")]
    MissingFieldError { table: String, field: &'static str },

    #[error("Field {field:?} of table {table:?} is not a number: {value:?}")]
    InvalidNumberError {
        table: String,
        field: &'static str,
        value: String,
    },

    #[error("{0:?} is not a valid time; HH:MM:SS format is expected")]
    InvalidTimeError(String),

    #[error("{0:?} is not a valid date; YYYYMMDD format is expected")]
    InvalidDateError(String),

    #[error("No rail line identifier known for {0:?}")]
    UnresolvedLineError(String),

    #[error("Failed to encode or decode a route artifact: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ProcessingError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    pub fn csv(table: &str, source: csv::Error) -> Self {
        Self::CsvError {
            table: table.to_owned(),
            source,
        }
    }
}
