//! Error taxonomy for alignment runs.
//!
//! Expected outcomes (a line with no acceptable match, an empty search
//! window) are never errors; they are encoded in the returned values.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlignError>;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("{what} not found: {}", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("{what} is empty: {}", path.display())]
    EmptyInput { what: &'static str, path: PathBuf },

    #[error("no timed text found anywhere in the ASR output")]
    NoTimedText,

    #[error("unrecognised timing table header in {}: {header}", path.display())]
    UnknownShape { path: PathBuf, header: String },

    #[error("malformed row {row} in {}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("timeline invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error while {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },
}

impl AlignError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: &std::path::Path, row: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            row,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_message() {
        let err = AlignError::MissingInput {
            what: "lyrics file",
            path: PathBuf::from("lyrics/song.txt"),
        };
        assert_eq!(err.to_string(), "lyrics file not found: lyrics/song.txt");
    }

    #[test]
    fn test_malformed_message() {
        let err = AlignError::malformed(std::path::Path::new("t.csv"), 3, "bad start");
        assert_eq!(err.to_string(), "malformed row 3 in t.csv: bad start");
    }
}
