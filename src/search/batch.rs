//! Grouping of a candidate stream into fixed-size work units

use crate::error::ConfigError;

/// Default number of candidates per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// An ordered chunk of candidates dispatched to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Strategy-local identifier, starting at 0.
    pub id: u64,
    pub candidates: Vec<String>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Pulls `batch_size` candidates at a time from the source. The last batch
/// may be shorter; an empty source yields no batches.
pub struct Batcher<I> {
    source: I,
    batch_size: usize,
    next_id: u64,
}

impl<I: Iterator<Item = String>> Batcher<I> {
    pub fn new(source: I, batch_size: usize) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        Ok(Self {
            source,
            batch_size,
            next_id: 0,
        })
    }
}

impl<I: Iterator<Item = String>> Iterator for Batcher<I> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let candidates: Vec<String> = self.source.by_ref().take(self.batch_size).collect();
        if candidates.is_empty() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        Some(Batch { id, candidates })
    }
}
