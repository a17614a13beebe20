//! Candidate search over a password space
//!
//! This module provides the pieces of the search engine:
//! - Candidate generation: lazy, restartable sequences per strategy
//! - Batching: fixed-size work units cut from a candidate stream
//! - Plans: ordered strategy lists, built from presets or a JSON file
//! - Parallel: the worker pool and the coordinator that drives it

pub mod batch;
pub mod candidate;
pub mod config;
pub mod parallel;
pub mod plan;
pub mod result;

pub use config::Strategy;
pub use result::SearchOutcome;

use crate::error::{SolverError, VerifyError};
use std::path::Path;
use std::sync::atomic::AtomicBool;

/// Tests one candidate password against a protected document.
///
/// Implementations are called concurrently from every worker thread and
/// must treat each call as an independent attempt.
pub trait CredentialVerifier: Send + Sync {
    /// One-time check that the document can be opened at all.
    ///
    /// Called before any candidate is dispatched. A `Setup` error aborts
    /// the search.
    fn prepare(&self, _document: &Path) -> Result<(), VerifyError> {
        Ok(())
    }

    /// Returns `Ok(true)` when `candidate` opens `document`.
    fn verify(&self, document: &Path, candidate: &str) -> Result<bool, VerifyError>;
}

/// A specialised external tool that can take over the whole search.
pub trait ExternalSolver: Send + Sync {
    /// Whether the tool and its prerequisites are installed.
    fn is_available(&self) -> bool;

    /// Run the tool against `document`, returning the recovered password
    /// if it found one. Must give up with [`SolverError::Cancelled`] soon
    /// after `cancel` is raised.
    fn solve(&self, document: &Path, cancel: &AtomicBool)
        -> Result<Option<String>, SolverError>;
}
