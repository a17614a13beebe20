//! Configuration for parallel search execution.

use crate::error::ConfigError;
use crate::search::batch::DEFAULT_BATCH_SIZE;

/// Strategies estimated above this many candidates need confirmation.
pub const DEFAULT_CONFIRM_THRESHOLD: u64 = 10_000_000;

/// Configuration for parallel search execution.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of worker threads to spawn.
    pub num_workers: usize,
    /// Candidates per batch.
    pub batch_size: usize,
    /// Maximum batches outstanding at once (None = 2 x workers).
    pub queue_depth: Option<usize>,
    /// Estimated size above which a strategy needs confirmation.
    pub confirm_threshold: u64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            batch_size: DEFAULT_BATCH_SIZE,
            queue_depth: None,
            confirm_threshold: DEFAULT_CONFIRM_THRESHOLD,
        }
    }
}

impl ParallelConfig {
    /// Create a new parallel config with the specified number of workers.
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    pub fn with_workers_option(self, num_workers: Option<usize>) -> Self {
        match num_workers {
            Some(n) => self.with_workers(n),
            None => self,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = Some(depth.max(1));
        self
    }

    pub fn with_queue_depth_option(self, depth: Option<usize>) -> Self {
        match depth {
            Some(d) => self.with_queue_depth(d),
            None => self,
        }
    }

    pub fn with_confirm_threshold(mut self, threshold: u64) -> Self {
        self.confirm_threshold = threshold;
        self
    }

    /// Outstanding-batch limit actually used by the coordinator.
    pub fn effective_queue_depth(&self) -> usize {
        self.queue_depth.unwrap_or(self.num_workers.max(1) * 2)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }
}
