//! Error types for the password search

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for a search invocation.
///
/// Only setup-level failures end up here. Per-candidate verifier errors are
/// absorbed by the workers and solver failures by the coordinator.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Verifier setup failed: {0}")]
    VerifierSetup(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by a credential verifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The document cannot be opened at all. Aborts the whole search.
    #[error("cannot open document: {0}")]
    Setup(String),

    /// A single attempt failed for reasons unrelated to the password.
    /// Counted as a tested non-match.
    #[error("verification attempt failed: {0}")]
    Transient(String),
}

/// Invalid strategy or search parameters, detected before any work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid length range {min}..={max} for strategy '{strategy}'")]
    InvalidLengthRange {
        strategy: String,
        min: usize,
        max: usize,
    },

    #[error("Length {0} exceeds the supported maximum of {max}", max = crate::search::config::MAX_CANDIDATE_LENGTH)]
    LengthTooLarge(usize),

    #[error("Empty charset for strategy '{0}'")]
    EmptyCharset(String),

    #[error("Invalid range {start}..={end} for strategy '{strategy}'")]
    InvalidRange {
        strategy: String,
        start: String,
        end: String,
    },

    #[error("Strategy '{0}' has no output formats")]
    NoFormats(String),

    #[error("Invalid batch size: {0}. Must be greater than 0")]
    InvalidBatchSize(usize),

    #[error("Wordlist not readable: {path}: {source}")]
    Wordlist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plan file {path}: {message}")]
    PlanFile { path: PathBuf, message: String },

    #[error("Empty strategy plan")]
    EmptyPlan,
}

/// Failure of the post-success decryption step.
#[derive(Error, Debug)]
pub enum DecryptError {
    #[error("decryption tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("decryption failed: {0}")]
    Failed(String),

    #[error("decrypted output {0} still requires a password")]
    StillEncrypted(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of the external solver delegate. Never fatal to the search.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("external solver not available: {0}")]
    Unavailable(String),

    #[error("hash extraction failed: {0}")]
    HashExtraction(String),

    #[error("solver timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("solver cancelled")]
    Cancelled,

    #[error("solver failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SearchError>;

impl From<VerifyError> for SearchError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Setup(msg) => SearchError::VerifierSetup(msg),
            VerifyError::Transient(msg) => SearchError::Internal(msg),
        }
    }
}
