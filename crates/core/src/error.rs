// crates/core/src/error.rs
//! Error types for dispatch and fetch operations.

use thiserror::Error;

/// Failures surfaced by [`MediaFetcher`](crate::fetcher::MediaFetcher)
/// implementations and the job runner.
///
/// The `Display` text of these variants is what clients see in the `error`
/// field of a terminal progress record, so messages are written for end
/// users, not operators.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The external tool binary could not be started at all.
    #[error("failed to start download tool: {0}")]
    SpawnFailed(String),

    /// The tool ran and exited non-zero. Carries the most useful line of
    /// its stderr.
    #[error("extraction failed: {0}")]
    Tool(String),

    /// Requested media kind is not one this service produces.
    #[error("unsupported media kind: {0}")]
    UnsupportedKind(String),

    /// Tool output that should have been machine-readable was not.
    #[error("could not parse tool output: {0}")]
    ParseFailed(String),

    /// The tool exited successfully but the artifact never became a stable,
    /// non-empty file within the readiness window.
    #[error("output file {0} was not created or is empty")]
    OutputMissing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures detectable at dispatch time, before any task record exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The request carried no usable URL.
    #[error("no URL provided")]
    EmptyUrl,
}
