//! Error type for toolchain resolution, source access and configuration.
//!
//! The pipeline builder itself does not use this type: misuse of the
//! builder panics and graph validation reports `io::Error` from
//! [`Pipeline::emit_to`](crate::Pipeline::emit_to).

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the library.
#[derive(Debug, Error)]
pub enum Error {
    /// A manifest entry names a tool that is not recognized.
    #[error("unknown toolchain requested {0:?}")]
    UnknownToolchain(String),

    /// The toolchain manifest does not exist in the source tree.
    #[error("toolchain manifest {path:?} not found")]
    ManifestUnavailable { path: String },

    /// A manifest line has more than one `=` and the strict policy is in use.
    #[error("malformed toolchain entry on line {line}: {entry:?}")]
    MalformedEntry { line: usize, entry: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Semantic validation of a parsed config failed.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
