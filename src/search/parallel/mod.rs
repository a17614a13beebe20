//! Parallel search execution over a pool of verifier threads.
//!
//! # Architecture
//!
//! The parallel search system consists of:
//! - A **coordinator** that walks the plan, cuts each strategy into batches
//!   and aggregates results
//! - A pool of **workers** that run the credential verifier over batches
//! - A **channel system**: one bounded work queue shared by all workers, one
//!   result channel back to the coordinator, and a shared stop signal
//!
//! The coordinator keeps at most `queue_depth` batches outstanding, so memory
//! stays bounded no matter how large a strategy is. Every dispatched batch is
//! answered exactly once, either with a result or as skipped.

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod worker;

pub use config::ParallelConfig;
pub use coordinator::{Collaborators, run_parallel_search};
