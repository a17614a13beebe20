//! Work and result channels between the coordinator and the workers.

use crate::search::batch::Batch;
use crate::search::result::VerificationResult;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Message sent from a worker to the coordinator. Every batch a worker
/// receives is answered with exactly one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// The batch was verified (fully, or up to its first match).
    Completed {
        worker_id: usize,
        result: VerificationResult,
    },
    /// The batch was dropped because the search is stopping.
    Skipped { worker_id: usize, batch_id: u64 },
    /// The verifier could not open the document at all.
    SetupFailed {
        worker_id: usize,
        batch_id: u64,
        message: String,
    },
    /// The verifier panicked.
    Crashed {
        worker_id: usize,
        batch_id: u64,
        message: String,
    },
}

/// Stop flag written only by the coordinator.
///
/// After a match, batches dispatched before the matching one still run so
/// that every candidate ahead of the match gets tested; only later batches
/// are dropped.
#[derive(Debug)]
pub struct StopSignal {
    should_stop: AtomicBool,
    /// Batches with an id at or above this are dropped once stopped.
    skip_from: AtomicU64,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self {
            should_stop: AtomicBool::new(false),
            skip_from: AtomicU64::new(u64::MAX),
        }
    }
}

impl StopSignal {
    /// Check if the search is winding down.
    pub fn should_stop(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }

    /// Whether a worker should drop `batch_id` without verifying it.
    pub fn should_skip(&self, batch_id: u64) -> bool {
        self.should_stop() && batch_id >= self.skip_from.load(Ordering::SeqCst)
    }

    /// Drop every queued batch.
    pub fn signal_stop(&self) {
        self.skip_from.store(0, Ordering::SeqCst);
        self.should_stop.store(true, Ordering::SeqCst);
    }

    /// Drop queued batches dispatched after `batch_id`.
    pub fn signal_match(&self, batch_id: u64) {
        self.skip_from
            .fetch_min(batch_id.saturating_add(1), Ordering::SeqCst);
        self.should_stop.store(true, Ordering::SeqCst);
    }
}

/// Channel endpoints for a worker.
pub struct WorkerChannels {
    /// Batches to verify, shared by all workers.
    pub work: Receiver<Batch>,
    /// Send results to the coordinator.
    pub to_coordinator: Sender<WorkerMessage>,
    pub stop: Arc<StopSignal>,
}

/// Channel endpoints for the coordinator.
pub struct CoordinatorChannels {
    /// Dispatch side of the work queue. Dropping it tells idle workers to exit.
    pub work: Option<Sender<Batch>>,
    /// Receive messages from workers.
    pub from_workers: Receiver<WorkerMessage>,
    pub stop: Arc<StopSignal>,
}

/// Create channels for `num_workers` workers sharing a work queue of
/// `queue_depth` batches.
pub fn create_channels(
    num_workers: usize,
    queue_depth: usize,
) -> (CoordinatorChannels, Vec<WorkerChannels>) {
    let stop = Arc::new(StopSignal::default());

    // Bounded queue: the coordinator never has more than `queue_depth`
    // batches outstanding, so dispatch does not block.
    let (work_tx, work_rx) = bounded(queue_depth.max(1));

    // Unbounded channel from workers to coordinator (workers shouldn't block)
    let (worker_tx, coordinator_rx) = unbounded();

    let workers = (0..num_workers)
        .map(|_| WorkerChannels {
            work: work_rx.clone(),
            to_coordinator: worker_tx.clone(),
            stop: Arc::clone(&stop),
        })
        .collect();

    let coordinator = CoordinatorChannels {
        work: Some(work_tx),
        from_workers: coordinator_rx,
        stop,
    };

    (coordinator, workers)
}
