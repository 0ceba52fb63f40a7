//! Error types for icu-tzdata-patch
//!
//! Every stage of the patch pipeline reports failure through [`Error`]. The
//! variants keep the distinctions the pipeline cares about: a bad HTTP status is
//! not a transport failure, and a merge tool that exits non-zero is not a merge
//! tool that failed to start.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for icu-tzdata-patch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for icu-tzdata-patch
///
/// The first error from any pipeline stage aborts the whole run; each variant
/// carries enough context to print a useful diagnostic without re-querying the
/// network or the filesystem.
#[derive(Debug, Error)]
pub enum Error {
    /// The target `.dat` bundle does not exist or is not readable
    #[error("invalid target bundle: {path} does not exist or is not readable")]
    InvalidTarget {
        /// The target path that failed the precondition check
        path: PathBuf,
    },

    /// The remote server answered with a non-200 status
    #[error("download of {url} failed: HTTP status {status}")]
    Remote {
        /// The URL that was requested
        url: String,
        /// The HTTP status code the server returned
        status: u16,
    },

    /// The request never produced a usable response (DNS, TLS, connection reset)
    #[error("download of {url} failed: {source}")]
    Transport {
        /// The URL that was requested
        url: String,
        /// The underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Writing the downloaded body to disk failed
    #[error("failed to write download to {path}: {source}")]
    Write {
        /// The destination file being written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The merge tool could not be started at all
    #[error("failed to launch {tool}: {source}")]
    Launch {
        /// The merge tool command name
        tool: String,
        /// The spawn error (typically: not found, not executable)
        #[source]
        source: std::io::Error,
    },

    /// The merge tool ran and exited with a non-zero status
    #[error("{tool} exited with status {code:?}: {stderr}")]
    ExitCode {
        /// The merge tool command name
        tool: String,
        /// The exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Everything the tool wrote to standard error
        stderr: String,
    },

    /// A derived resource URL could not be parsed
    #[error("invalid resource URL '{raw}': {source}")]
    InvalidUrl {
        /// The URL text that failed to parse
        raw: String,
        /// The underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// I/O error outside the download write path
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
