// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::fmt;

/// Represents errors that can occur anywhere in the HTS readers.
#[derive(Debug)]
pub enum Error {
    /// Generic I/O error (file open, read, seek).
    Io(std::io::Error),

    /// An HTS record or header failed to decode.
    Htsget(String),

    /// A call into the host engine failed.
    Duckdb(String),

    /// The derived schema is internally inconsistent (e.g. a `column_types`
    /// list whose length does not match the detected column count).
    Schema(String),

    /// A user-supplied region string could not be parsed or resolved
    /// against the file's contig list.
    InvalidRegion(String),

    /// Two named options were given that are mutually exclusive.
    UnsupportedOption(String),

    /// FASTQ pairing was requested but the two streams fell out of sync.
    PairingFailure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Htsget(msg) => write!(f, "HTS decode error: {msg}"),
            Self::Duckdb(msg) => write!(f, "DuckDB error: {msg}"),
            Self::Schema(msg) => write!(f, "schema error: {msg}"),
            Self::InvalidRegion(msg) => write!(f, "invalid region: {msg}"),
            Self::UnsupportedOption(msg) => write!(f, "unsupported option: {msg}"),
            Self::PairingFailure(msg) => write!(f, "pairing failure: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<duckdb::Error> for Error {
    fn from(value: duckdb::Error) -> Self {
        Self::Duckdb(value.to_string())
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
