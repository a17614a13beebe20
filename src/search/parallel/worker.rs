//! Worker threads that run the verifier over batches.

use crate::error::VerifyError;
use crate::search::CredentialVerifier;
use crate::search::batch::Batch;
use crate::search::parallel::channel::{WorkerChannels, WorkerMessage};
use crate::search::result::VerificationResult;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

/// Worker loop: take batches until the coordinator closes the queue.
pub fn run_worker(
    worker_id: usize,
    verifier: &dyn CredentialVerifier,
    document: &Path,
    channels: WorkerChannels,
) {
    for batch in channels.work.iter() {
        let message = if channels.stop.should_skip(batch.id) {
            WorkerMessage::Skipped {
                worker_id,
                batch_id: batch.id,
            }
        } else {
            process_batch(worker_id, verifier, document, &batch)
        };

        if channels.to_coordinator.send(message).is_err() {
            // Coordinator is gone; nothing left to report to.
            break;
        }
    }
}

fn process_batch(
    worker_id: usize,
    verifier: &dyn CredentialVerifier,
    document: &Path,
    batch: &Batch,
) -> WorkerMessage {
    match catch_unwind(AssertUnwindSafe(|| verify_batch(verifier, document, batch))) {
        Ok(Ok(result)) => WorkerMessage::Completed { worker_id, result },
        Ok(Err(message)) => WorkerMessage::SetupFailed {
            worker_id,
            batch_id: batch.id,
            message,
        },
        Err(panic) => WorkerMessage::Crashed {
            worker_id,
            batch_id: batch.id,
            message: panic_message(panic.as_ref()),
        },
    }
}

/// Try every candidate of `batch` in order, stopping at the first match.
///
/// Transient verifier errors count as tested non-matches. A setup error
/// ends the batch immediately and is returned as `Err`.
pub fn verify_batch(
    verifier: &dyn CredentialVerifier,
    document: &Path,
    batch: &Batch,
) -> Result<VerificationResult, String> {
    let mut transient_errors = 0;

    for (index, candidate) in batch.candidates.iter().enumerate() {
        match verifier.verify(document, candidate) {
            Ok(true) => {
                return Ok(VerificationResult::matched(
                    batch.id,
                    candidate.clone(),
                    index as u64 + 1,
                    transient_errors,
                ));
            }
            Ok(false) => {}
            Err(VerifyError::Transient(reason)) => {
                log::debug!("candidate {:?} treated as non-match: {}", candidate, reason);
                transient_errors += 1;
            }
            Err(VerifyError::Setup(reason)) => return Err(reason),
        }
    }

    Ok(VerificationResult::no_match(
        batch.id,
        batch.len() as u64,
        transient_errors,
    ))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "verifier panicked".to_string()
    }
}
