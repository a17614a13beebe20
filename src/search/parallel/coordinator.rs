//! Search coordinator: drives the plan, dispatches batches to the worker
//! pool and aggregates their answers.

use crate::error::{Result, SearchError, SolverError, VerifyError};
use crate::prompt::{ConfirmationPrompt, NeverConfirm};
use crate::search::batch::Batcher;
use crate::search::config::Strategy;
use crate::search::parallel::channel::{CoordinatorChannels, WorkerMessage, create_channels};
use crate::search::parallel::config::ParallelConfig;
use crate::search::parallel::worker::run_worker;
use crate::search::result::{SearchOutcome, SearchStatistics};
use crate::search::{CredentialVerifier, ExternalSolver};
use crate::telemetry::{NullSink, ProgressSnapshot, TelemetryPublisher, TelemetrySink};
use crossbeam_channel::RecvTimeoutError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How often the coordinator wakes up to check for interruption while
/// waiting on workers.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the coordinator calls out to.
pub struct Collaborators {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub prompt: Box<dyn ConfirmationPrompt>,
    pub solver: Option<Arc<dyn ExternalSolver>>,
    pub sink: Box<dyn TelemetrySink>,
    /// Raised by the caller (e.g. on Ctrl-C) to stop the search early.
    pub cancel: Arc<AtomicBool>,
}

impl Collaborators {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            verifier,
            prompt: Box::new(NeverConfirm),
            solver: None,
            sink: Box::new(NullSink),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_prompt(mut self, prompt: Box<dyn ConfirmationPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_solver(mut self, solver: Arc<dyn ExternalSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancel_token(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }
}

/// How one strategy ended.
#[derive(Debug, PartialEq, Eq)]
enum StrategyEnd {
    Exhausted,
    Skipped,
    Found(String),
    Interrupted,
}

/// Run `plan` against `document` until a candidate verifies or the plan is
/// exhausted.
///
/// Configuration and every strategy are validated before the verifier's
/// one-time setup check; both happen before any batch is dispatched. The
/// worker pool lives for the whole plan and is joined before returning, so
/// no verifier call from this search can happen after this function
/// returns.
pub fn run_parallel_search(
    document: &Path,
    plan: &[Strategy],
    collaborators: Collaborators,
    config: &ParallelConfig,
) -> Result<SearchOutcome> {
    config.validate()?;
    for strategy in plan {
        strategy.validate()?;
    }

    collaborators.verifier.prepare(document)?;

    let start_time = Instant::now();
    let num_workers = config.num_workers.max(1);
    let queue_depth = config.effective_queue_depth();
    log::info!(
        "Searching {} with {} workers (batch size {}, queue depth {})",
        document.display(),
        num_workers,
        config.batch_size,
        queue_depth
    );

    let (coordinator_channels, worker_channels) = create_channels(num_workers, queue_depth);
    let document_arc = Arc::new(document.to_path_buf());

    let mut worker_handles = Vec::with_capacity(num_workers);
    for (worker_id, channels) in worker_channels.into_iter().enumerate() {
        let verifier = Arc::clone(&collaborators.verifier);
        let document = Arc::clone(&document_arc);
        let handle = std::thread::Builder::new()
            .name(format!("verifier-{}", worker_id))
            .spawn(move || run_worker(worker_id, verifier.as_ref(), &document, channels))?;
        worker_handles.push(handle);
    }

    let telemetry = TelemetryPublisher::spawn(collaborators.sink);
    let mut coordinator = Coordinator {
        document: document.to_path_buf(),
        channels: coordinator_channels,
        verifier: collaborators.verifier,
        prompt: collaborators.prompt,
        solver: collaborators.solver,
        cancel: collaborators.cancel,
        telemetry,
        config: config.clone(),
        queue_depth,
        start_time,
        outstanding: 0,
        stats: SearchStatistics::default(),
        found: None,
        failure: None,
        interrupted: false,
    };

    let result = coordinator.run_plan(plan);
    let Coordinator {
        channels, telemetry, ..
    } = coordinator;

    shutdown_workers(channels, worker_handles);
    telemetry.finish();

    result
}

fn shutdown_workers(mut channels: CoordinatorChannels, handles: Vec<JoinHandle<()>>) {
    channels.stop.signal_stop();
    channels.work.take();
    for handle in handles {
        let _ = handle.join();
    }
}

struct Coordinator {
    document: PathBuf,
    channels: CoordinatorChannels,
    verifier: Arc<dyn CredentialVerifier>,
    prompt: Box<dyn ConfirmationPrompt>,
    solver: Option<Arc<dyn ExternalSolver>>,
    cancel: Arc<AtomicBool>,
    telemetry: TelemetryPublisher,
    config: ParallelConfig,
    queue_depth: usize,
    start_time: Instant,
    /// Batches dispatched and not yet answered.
    outstanding: usize,
    stats: SearchStatistics,
    found: Option<String>,
    failure: Option<SearchError>,
    interrupted: bool,
}

impl Coordinator {
    fn run_plan(&mut self, plan: &[Strategy]) -> Result<SearchOutcome> {
        for (index, strategy) in plan.iter().enumerate() {
            if self.cancel_requested() {
                self.interrupted = true;
                break;
            }

            let end = self.run_strategy(index, strategy)?;
            match end {
                StrategyEnd::Found(candidate) => {
                    log::info!("Match found by strategy '{}'", strategy);
                    return Ok(SearchOutcome::Found {
                        candidate,
                        strategy: strategy.to_string(),
                        statistics: self.snapshot_statistics(),
                    });
                }
                StrategyEnd::Interrupted => break,
                StrategyEnd::Skipped => self.stats.strategies_skipped += 1,
                StrategyEnd::Exhausted => {
                    log::info!("Strategy '{}' exhausted without a match", strategy);
                }
            }
        }

        let statistics = self.snapshot_statistics();
        if self.interrupted {
            log::warn!(
                "Search interrupted after {} candidates",
                statistics.candidates_tested
            );
            Ok(SearchOutcome::Interrupted { statistics })
        } else {
            Ok(SearchOutcome::NotFound { statistics })
        }
    }

    fn run_strategy(&mut self, index: usize, strategy: &Strategy) -> Result<StrategyEnd> {
        if let Strategy::ExternalSolver = strategy {
            return self.run_external_solver();
        }

        let estimate = strategy.estimated_count();
        if let Some(estimated) = estimate.filter(|&n| n > self.config.confirm_threshold) {
            // The previous strategy's progress display must not draw over
            // the question.
            self.telemetry.end_strategy();
            if !self.prompt.confirm(&strategy.to_string(), estimated) {
                log::warn!("Skipping strategy '{}' ({} candidates)", strategy, estimated);
                return Ok(StrategyEnd::Skipped);
            }
        }

        match estimate {
            Some(n) => log::info!("Strategy {}: {} (~{} candidates)", index + 1, strategy, n),
            None => log::info!("Strategy {}: {}", index + 1, strategy),
        }
        self.stats.strategies_run += 1;

        let mut batches = Batcher::new(strategy.candidates()?, self.config.batch_size)?;
        let mut source_done = false;
        let mut strategy_tested = 0u64;

        loop {
            while !source_done && self.outstanding < self.queue_depth && !self.stopping() {
                match batches.next() {
                    Some(batch) => self.dispatch(batch)?,
                    None => source_done = true,
                }
            }

            if self.outstanding == 0 {
                break;
            }

            if !self.stopping() && self.cancel_requested() {
                log::info!("Interrupt received, waiting for in-flight batches");
                self.interrupted = true;
                self.channels.stop.signal_stop();
            }

            match self.channels.from_workers.recv_timeout(POLL_INTERVAL) {
                Ok(message) => {
                    self.outstanding -= 1;
                    if let Some(tested) = self.handle_message(message) {
                        strategy_tested += tested;
                        self.telemetry.publish(ProgressSnapshot {
                            strategy_index: index,
                            strategy: strategy.name().to_string(),
                            tested: self.stats.candidates_tested,
                            strategy_tested,
                            total_estimate: estimate,
                            elapsed: self.start_time.elapsed(),
                        });
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SearchError::Internal(
                        "all verifier workers exited unexpectedly".to_string(),
                    ));
                }
            }
        }

        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        if let Some(candidate) = self.found.take() {
            return Ok(StrategyEnd::Found(candidate));
        }
        if self.interrupted {
            return Ok(StrategyEnd::Interrupted);
        }
        Ok(StrategyEnd::Exhausted)
    }

    fn dispatch(&mut self, batch: crate::search::batch::Batch) -> Result<()> {
        let work = self
            .channels
            .work
            .as_ref()
            .ok_or_else(|| SearchError::Internal("work queue closed".to_string()))?;
        log::debug!("dispatching batch {} ({} candidates)", batch.id, batch.len());
        work.send(batch)
            .map_err(|_| SearchError::Internal("work queue disconnected".to_string()))?;
        self.outstanding += 1;
        self.stats.batches_dispatched += 1;
        Ok(())
    }

    /// Fold one worker message into the aggregate state. Returns the number
    /// of candidates it accounts for, if any were tested.
    fn handle_message(&mut self, message: WorkerMessage) -> Option<u64> {
        match message {
            WorkerMessage::Completed { worker_id, result } => {
                self.stats.batches_completed += 1;
                self.stats.candidates_tested += result.tested;
                self.stats.transient_errors += result.transient_errors;
                let first_match = result.success && self.found.is_none() && self.failure.is_none();
                if let Some(candidate) = result.matched.filter(|_| first_match) {
                    log::debug!("worker {} matched in batch {}", worker_id, result.batch_id);
                    self.found = Some(candidate);
                    self.channels.stop.signal_match(result.batch_id);
                }
                Some(result.tested)
            }
            WorkerMessage::Skipped { .. } => {
                self.stats.batches_skipped += 1;
                None
            }
            WorkerMessage::SetupFailed {
                worker_id,
                batch_id,
                message,
            } => {
                log::error!(
                    "worker {} could not open the document (batch {}): {}",
                    worker_id,
                    batch_id,
                    message
                );
                self.record_failure(SearchError::VerifierSetup(message));
                None
            }
            WorkerMessage::Crashed {
                worker_id,
                batch_id,
                message,
            } => {
                log::error!("worker {} crashed on batch {}: {}", worker_id, batch_id, message);
                self.record_failure(SearchError::Internal(format!(
                    "verifier panicked: {}",
                    message
                )));
                None
            }
        }
    }

    fn record_failure(&mut self, error: SearchError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
        self.channels.stop.signal_stop();
    }

    fn run_external_solver(&mut self) -> Result<StrategyEnd> {
        let Some(solver) = self.solver.clone() else {
            log::warn!("No external solver configured, skipping");
            return Ok(StrategyEnd::Skipped);
        };
        if !solver.is_available() {
            log::warn!("External solver unavailable, falling back to the next strategy");
            return Ok(StrategyEnd::Skipped);
        }

        self.stats.strategies_run += 1;
        log::info!("Delegating search to the external solver");
        let candidate = match solver.solve(&self.document, &self.cancel) {
            Ok(Some(candidate)) => candidate,
            Err(SolverError::Cancelled) => {
                log::info!("Interrupt received, external solver stopped");
                self.interrupted = true;
                return Ok(StrategyEnd::Interrupted);
            }
            _ if self.cancel_requested() => {
                self.interrupted = true;
                return Ok(StrategyEnd::Interrupted);
            }
            Ok(None) => {
                log::info!("External solver did not find the password");
                return Ok(StrategyEnd::Exhausted);
            }
            Err(e) => {
                log::warn!("External solver failed: {}", e);
                return Ok(StrategyEnd::Exhausted);
            }
        };

        self.stats.candidates_tested += 1;
        match self.verifier.verify(&self.document, &candidate) {
            Ok(true) => Ok(StrategyEnd::Found(candidate)),
            Ok(false) => {
                log::warn!("External solver returned a password that does not open the document");
                Ok(StrategyEnd::Exhausted)
            }
            Err(VerifyError::Transient(reason)) => {
                log::warn!("Could not confirm the external solver's password: {}", reason);
                Ok(StrategyEnd::Exhausted)
            }
            Err(err @ VerifyError::Setup(_)) => Err(err.into()),
        }
    }

    fn stopping(&self) -> bool {
        self.channels.stop.should_stop()
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn snapshot_statistics(&self) -> SearchStatistics {
        let mut statistics = self.stats.clone();
        statistics.elapsed_time = self.start_time.elapsed();
        statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::AlwaysConfirm;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU64;

    /// Verifier stub that matches a fixed set of passwords and counts calls.
    struct PlantedVerifier {
        passwords: Vec<String>,
        calls: AtomicU64,
        seen: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl PlantedVerifier {
        fn new(passwords: &[&str]) -> Self {
            Self {
                passwords: passwords.iter().map(|p| p.to_string()).collect(),
                calls: AtomicU64::new(0),
                seen: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CredentialVerifier for PlantedVerifier {
        fn verify(&self, _document: &Path, candidate: &str) -> std::result::Result<bool, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(candidate.to_string());
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            Ok(self.passwords.iter().any(|p| p == candidate))
        }
    }

    struct UnreadableDocument;

    impl CredentialVerifier for UnreadableDocument {
        fn prepare(&self, document: &Path) -> std::result::Result<(), VerifyError> {
            Err(VerifyError::Setup(format!("{} missing", document.display())))
        }

        fn verify(&self, _document: &Path, _candidate: &str) -> std::result::Result<bool, VerifyError> {
            panic!("must not be called after a failed prepare");
        }
    }

    /// Fails with a setup error on a specific candidate.
    struct FailsOn(&'static str);

    impl CredentialVerifier for FailsOn {
        fn verify(&self, _document: &Path, candidate: &str) -> std::result::Result<bool, VerifyError> {
            if candidate == self.0 {
                Err(VerifyError::Setup("document vanished".to_string()))
            } else {
                Ok(false)
            }
        }
    }

    struct FixedSolver(std::result::Result<Option<String>, ()>);

    impl ExternalSolver for FixedSolver {
        fn is_available(&self) -> bool {
            true
        }

        fn solve(
            &self,
            _document: &Path,
            _cancel: &AtomicBool,
        ) -> std::result::Result<Option<String>, SolverError> {
            self.0
                .clone()
                .map_err(|_| SolverError::Failed("exit status 255".to_string()))
        }
    }

    /// Runs for `duration` unless cancelled, polling like a child process
    /// wait would.
    struct SlowSolver {
        duration: Duration,
    }

    impl ExternalSolver for SlowSolver {
        fn is_available(&self) -> bool {
            true
        }

        fn solve(
            &self,
            _document: &Path,
            cancel: &AtomicBool,
        ) -> std::result::Result<Option<String>, SolverError> {
            let start = Instant::now();
            while start.elapsed() < self.duration {
                if cancel.load(Ordering::SeqCst) {
                    return Err(SolverError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(None)
        }
    }

    struct CountingPrompt {
        answer: bool,
        asked: Arc<AtomicU64>,
    }

    impl ConfirmationPrompt for CountingPrompt {
        fn confirm(&self, _description: &str, _estimated: u64) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    struct RecordingSink(Arc<Mutex<Vec<ProgressSnapshot>>>);

    impl TelemetrySink for RecordingSink {
        fn record(&mut self, snapshot: &ProgressSnapshot) {
            self.0.lock().unwrap().push(snapshot.clone());
        }
    }

    fn doc() -> &'static Path {
        Path::new("target.pdf")
    }

    fn config(workers: usize, batch_size: usize) -> ParallelConfig {
        ParallelConfig::default()
            .with_workers(workers)
            .with_batch_size(batch_size)
    }

    fn numeric(min_len: usize, max_len: usize) -> Strategy {
        Strategy::Numeric { min_len, max_len }
    }

    fn search(
        verifier: &Arc<PlantedVerifier>,
        plan: &[Strategy],
        config: &ParallelConfig,
    ) -> SearchOutcome {
        let verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        run_parallel_search(doc(), plan, Collaborators::new(verifier), config).unwrap()
    }

    #[test]
    fn test_finds_planted_candidate() {
        // "4321" sits at position 10 + 100 + 1000 + 4321 of numeric 1-4.
        let position = 10 + 100 + 1000 + 4321;
        let strategy_size = 11110;
        for workers in [1, 2, 4] {
            let verifier = Arc::new(PlantedVerifier::new(&["4321"]));
            let outcome = search(&verifier, &[numeric(1, 4)], &config(workers, 64));

            assert_eq!(outcome.found(), Some("4321"));
            assert!(outcome.total_tested() >= position + 1);
            assert!(outcome.total_tested() <= strategy_size);
        }
    }

    #[test]
    fn test_single_worker_counts_exactly() {
        let verifier = Arc::new(PlantedVerifier::new(&["42"]));
        let config = config(1, 10).with_queue_depth(1);
        let outcome = search(&verifier, &[numeric(1, 2)], &config);

        assert_eq!(outcome.found(), Some("42"));
        // One worker, one batch in flight: nothing past the match is tested.
        assert_eq!(outcome.total_tested(), 10 + 42 + 1);
        assert_eq!(verifier.calls(), 53);
    }

    #[test]
    fn test_list_then_numeric_scenario() {
        let batch_size = 16;
        let verifier = Arc::new(PlantedVerifier::new(&["42"]));
        let plan = [Strategy::list("common", &["admin", "1234"]), numeric(1, 2)];
        let outcome = search(&verifier, &plan, &config(4, batch_size));

        assert_eq!(outcome.found(), Some("42"));
        let position = 2 + 10 + 42;
        assert!(outcome.total_tested() >= position as u64 + 1);
        assert!(outcome.total_tested() <= 2 + 110);
        match &outcome {
            SearchOutcome::Found { strategy, .. } => assert_eq!(strategy, "numeric 1-2 digits"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_match_in_first_strategy_skips_the_rest() {
        let verifier = Arc::new(PlantedVerifier::new(&["1234"]));
        let plan = [Strategy::list("common", &["admin", "1234"]), numeric(1, 6)];
        let outcome = search(&verifier, &plan, &config(2, 100));

        assert_eq!(outcome.found(), Some("1234"));
        assert_eq!(outcome.total_tested(), 2);
        assert_eq!(verifier.calls(), 2);
    }

    #[test]
    fn test_not_found_is_idempotent() {
        let plan = [
            Strategy::list("common", &["admin", "password"]),
            numeric(1, 3),
            Strategy::charset("ab", "ab", 1, 4),
        ];
        let expected = 2 + 1110 + 30;

        let mut totals = Vec::new();
        for _ in 0..2 {
            let verifier = Arc::new(PlantedVerifier::new(&[]));
            let outcome = search(&verifier, &plan, &config(3, 37));
            assert!(matches!(outcome, SearchOutcome::NotFound { .. }));
            assert_eq!(verifier.calls(), expected);
            totals.push(outcome.total_tested());
        }
        assert_eq!(totals, vec![expected, expected]);
    }

    #[test]
    fn test_duplicates_across_strategies_are_tested_again() {
        let verifier = Arc::new(PlantedVerifier::new(&[]));
        let plan = [Strategy::list("digits", &["1", "2"]), numeric(1, 1)];
        let outcome = search(&verifier, &plan, &config(2, 4));

        assert_eq!(outcome.total_tested(), 12);
        let seen = verifier.seen.lock().unwrap();
        assert_eq!(seen.iter().filter(|c| c.as_str() == "1").count(), 2);
    }

    #[test]
    fn test_no_verifier_calls_after_return() {
        let verifier = Arc::new(
            PlantedVerifier::new(&["0005"]).with_delay(Duration::from_millis(1)),
        );
        let outcome = search(&verifier, &[numeric(4, 4)], &config(4, 8));
        assert_eq!(outcome.found(), Some("0005"));

        let calls_at_return = verifier.calls();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(verifier.calls(), calls_at_return);

        // Queued batches after the match are skipped, never verified.
        assert!(calls_at_return < 10_000);
        let stats = outcome.statistics();
        assert_eq!(
            stats.batches_dispatched,
            stats.batches_completed + stats.batches_skipped
        );
    }

    #[test]
    fn test_gated_strategy_declined_is_skipped() {
        let verifier = Arc::new(PlantedVerifier::new(&["7"]));
        let asked = Arc::new(AtomicU64::new(0));
        let huge = Strategy::charset("huge", "abcdefghijklmnopqrst", 1, 6);
        assert!(huge.estimated_count().unwrap() >= 20_000_000);

        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let collaborators = Collaborators::new(dyn_verifier).with_prompt(Box::new(CountingPrompt {
            answer: false,
            asked: Arc::clone(&asked),
        }));
        let outcome =
            run_parallel_search(doc(), &[huge, numeric(1, 1)], collaborators, &config(2, 10))
                .unwrap();

        assert_eq!(asked.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.found(), Some("7"));
        assert_eq!(outcome.statistics().strategies_skipped, 1);
        // Nothing from the gated strategy reached the verifier.
        let seen = verifier.seen.lock().unwrap();
        assert!(seen.iter().all(|c| c.chars().all(|ch| ch.is_ascii_digit())));
        assert_eq!(verifier.calls(), 8);
    }

    #[test]
    fn test_gated_strategy_confirmed_runs() {
        let verifier = Arc::new(PlantedVerifier::new(&["b"]));
        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let collaborators = Collaborators::new(dyn_verifier).with_prompt(Box::new(AlwaysConfirm));
        let config = config(2, 10).with_confirm_threshold(1);
        let outcome =
            run_parallel_search(doc(), &[Strategy::charset("ab", "ab", 1, 2)], collaborators, &config)
                .unwrap();
        assert_eq!(outcome.found(), Some("b"));
    }

    /// Prompt and sink that append to one shared log, to check what the
    /// terminal sees in which order.
    struct LoggingPrompt(Arc<Mutex<Vec<String>>>);

    impl ConfirmationPrompt for LoggingPrompt {
        fn confirm(&self, description: &str, _estimated: u64) -> bool {
            self.0.lock().unwrap().push(format!("prompt {}", description));
            true
        }
    }

    struct LoggingSink(Arc<Mutex<Vec<String>>>);

    impl TelemetrySink for LoggingSink {
        fn record(&mut self, snapshot: &ProgressSnapshot) {
            self.0
                .lock()
                .unwrap()
                .push(format!("progress {}", snapshot.strategy));
        }

        fn end_strategy(&mut self) {
            self.0.lock().unwrap().push("end".to_string());
        }
    }

    #[test]
    fn test_progress_display_released_before_prompt() {
        let verifier: Arc<dyn CredentialVerifier> = Arc::new(PlantedVerifier::new(&["ba"]));
        let events = Arc::new(Mutex::new(Vec::new()));
        let collaborators = Collaborators::new(verifier)
            .with_prompt(Box::new(LoggingPrompt(Arc::clone(&events))))
            .with_sink(Box::new(LoggingSink(Arc::clone(&events))));
        // Only the two-symbol charset crosses the threshold.
        let config = config(1, 5).with_confirm_threshold(10);
        let plan = [numeric(1, 1), Strategy::charset("ab", "ab", 1, 3)];
        let outcome = run_parallel_search(doc(), &plan, collaborators, &config).unwrap();
        assert_eq!(outcome.found(), Some("ba"));

        let events = events.lock().unwrap();
        let prompt = events
            .iter()
            .position(|e| e.starts_with("prompt"))
            .unwrap();
        assert_eq!(events[prompt - 1], "end");
        assert!(events[..prompt].iter().any(|e| e == "progress numeric"));
    }

    #[test]
    fn test_prepare_failure_is_fatal_before_dispatch() {
        let verifier: Arc<dyn CredentialVerifier> = Arc::new(UnreadableDocument);
        let result = run_parallel_search(
            doc(),
            &[numeric(1, 2)],
            Collaborators::new(verifier),
            &config(2, 10),
        );
        assert!(matches!(result, Err(SearchError::VerifierSetup(_))));
    }

    #[test]
    fn test_setup_error_mid_search_aborts() {
        let verifier: Arc<dyn CredentialVerifier> = Arc::new(FailsOn("50"));
        let result = run_parallel_search(
            doc(),
            &[numeric(1, 3), Strategy::list("later", &["x"])],
            Collaborators::new(verifier),
            &config(3, 5),
        );
        match result {
            Err(SearchError::VerifierSetup(message)) => assert_eq!(message, "document vanished"),
            other => panic!("expected setup failure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_strategy_fails_before_work() {
        let verifier = Arc::new(PlantedVerifier::new(&[]));
        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let result = run_parallel_search(
            doc(),
            &[Strategy::list("ok", &["a"]), numeric(3, 1)],
            Collaborators::new(dyn_verifier),
            &config(2, 10),
        );
        assert!(matches!(result, Err(SearchError::Config(_))));
        assert_eq!(verifier.calls(), 0);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let verifier = Arc::new(PlantedVerifier::new(&[]));
        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let result = run_parallel_search(
            doc(),
            &[numeric(1, 1)],
            Collaborators::new(dyn_verifier),
            &config(1, 0),
        );
        assert!(matches!(result, Err(SearchError::Config(_))));
    }

    #[test]
    fn test_empty_plan_and_empty_strategies() {
        let verifier = Arc::new(PlantedVerifier::new(&["x"]));
        let outcome = search(&verifier, &[], &config(2, 10));
        assert!(matches!(outcome, SearchOutcome::NotFound { .. }));

        let outcome = search(&verifier, &[numeric(0, 0), Strategy::list("none", &[])], &config(2, 10));
        assert!(matches!(outcome, SearchOutcome::NotFound { .. }));
        assert_eq!(outcome.total_tested(), 0);
        assert_eq!(verifier.calls(), 0);
    }

    #[test]
    fn test_cancel_token_interrupts() {
        let verifier = Arc::new(PlantedVerifier::new(&[]));
        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let cancel = Arc::new(AtomicBool::new(true));
        let outcome = run_parallel_search(
            doc(),
            &[numeric(1, 4)],
            Collaborators::new(dyn_verifier).with_cancel_token(cancel),
            &config(2, 10),
        )
        .unwrap();
        assert!(matches!(outcome, SearchOutcome::Interrupted { .. }));
        assert_eq!(verifier.calls(), 0);
    }

    #[test]
    fn test_cancel_mid_strategy_reports_partial_progress() {
        let verifier = Arc::new(
            PlantedVerifier::new(&[]).with_delay(Duration::from_millis(2)),
        );
        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&cancel);
        let interrupter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            trigger.store(true, Ordering::SeqCst);
        });

        let outcome = run_parallel_search(
            doc(),
            &[numeric(1, 6)],
            Collaborators::new(dyn_verifier).with_cancel_token(cancel),
            &config(2, 10),
        )
        .unwrap();
        interrupter.join().unwrap();

        assert!(matches!(outcome, SearchOutcome::Interrupted { .. }));
        assert!(outcome.total_tested() > 0);
        assert!(outcome.total_tested() < 1_111_110);
        assert_eq!(outcome.total_tested(), verifier.calls());
    }

    #[test]
    fn test_external_solver_result_is_confirmed() {
        let verifier = Arc::new(PlantedVerifier::new(&["hunter2"]));
        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let collaborators = Collaborators::new(dyn_verifier)
            .with_solver(Arc::new(FixedSolver(Ok(Some("hunter2".to_string())))));
        let outcome = run_parallel_search(
            doc(),
            &[Strategy::ExternalSolver, numeric(1, 3)],
            collaborators,
            &config(2, 10),
        )
        .unwrap();

        assert_eq!(outcome.found(), Some("hunter2"));
        assert_eq!(outcome.total_tested(), 1);
        assert_eq!(verifier.calls(), 1);
    }

    #[test]
    fn test_external_solver_failure_falls_back() {
        for solver in [FixedSolver(Err(())), FixedSolver(Ok(None)), FixedSolver(Ok(Some("wrong".to_string())))] {
            let verifier = Arc::new(PlantedVerifier::new(&["9"]));
            let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
            let collaborators = Collaborators::new(dyn_verifier).with_solver(Arc::new(solver));
            let outcome = run_parallel_search(
                doc(),
                &[Strategy::ExternalSolver, numeric(1, 1)],
                collaborators,
                &config(1, 10),
            )
            .unwrap();
            assert_eq!(outcome.found(), Some("9"));
        }
    }

    #[test]
    fn test_cancel_stops_external_solver() {
        let verifier = Arc::new(PlantedVerifier::new(&["1"]));
        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&cancel);
        let interrupter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            trigger.store(true, Ordering::SeqCst);
        });

        let collaborators = Collaborators::new(dyn_verifier)
            .with_solver(Arc::new(SlowSolver {
                duration: Duration::from_millis(1500),
            }))
            .with_cancel_token(cancel);
        let start = Instant::now();
        let outcome = run_parallel_search(
            doc(),
            &[Strategy::ExternalSolver, numeric(1, 1)],
            collaborators,
            &config(1, 10),
        )
        .unwrap();
        interrupter.join().unwrap();

        assert!(matches!(outcome, SearchOutcome::Interrupted { .. }));
        assert!(start.elapsed() < Duration::from_millis(1000));
        // The strategy after the solver never ran.
        assert_eq!(verifier.calls(), 0);
    }

    #[test]
    fn test_missing_solver_is_skipped() {
        let verifier = Arc::new(PlantedVerifier::new(&[]));
        let outcome = search(&verifier, &[Strategy::ExternalSolver], &config(1, 10));
        assert!(matches!(outcome, SearchOutcome::NotFound { .. }));
        assert_eq!(outcome.statistics().strategies_skipped, 1);
    }

    #[test]
    fn test_telemetry_snapshots_are_cumulative() {
        let verifier = Arc::new(PlantedVerifier::new(&[]));
        let dyn_verifier: Arc<dyn CredentialVerifier> = verifier.clone();
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let collaborators =
            Collaborators::new(dyn_verifier).with_sink(Box::new(RecordingSink(Arc::clone(&snapshots))));
        let outcome =
            run_parallel_search(doc(), &[numeric(1, 2)], collaborators, &config(1, 11)).unwrap();

        let snapshots = snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 10);
        let tested: Vec<u64> = snapshots.iter().map(|s| s.tested).collect();
        assert!(tested.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(tested.last().copied(), Some(outcome.total_tested()));
        assert!(snapshots.iter().all(|s| s.total_estimate == Some(110)));
    }
}
