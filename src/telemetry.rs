//! Progress reporting
//!
//! The coordinator publishes a [`ProgressSnapshot`] after every answered
//! batch. Snapshots go through a small bounded buffer to a dedicated thread
//! that feeds the sink, so a slow terminal never stalls dispatch. When the
//! buffer is full the snapshot is dropped; the next one supersedes it.
//!
//! Before the coordinator talks to the terminal itself (the confirmation
//! prompt) it calls [`TelemetryPublisher::end_strategy`], which waits until
//! the sink has taken down any live progress bar.

use crossbeam_channel::{Sender, TrySendError, bounded};
use indicatif::{ProgressBar, ProgressStyle};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Capacity of the buffer between the coordinator and the sink thread.
pub const TELEMETRY_BUFFER: usize = 64;

/// Counters observed after one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Index of the running strategy in the plan
    pub strategy_index: usize,
    pub strategy: String,
    /// Candidates tested across the whole search
    pub tested: u64,
    /// Candidates tested in the running strategy
    pub strategy_tested: u64,
    /// Estimated size of the running strategy, if known
    pub total_estimate: Option<u64>,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Candidates per second over the whole search.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.tested as f64 / secs
        }
    }
}

/// Consumer of progress snapshots. Purely observational.
pub trait TelemetrySink: Send {
    fn record(&mut self, snapshot: &ProgressSnapshot);

    /// The running strategy is over; release the terminal.
    fn end_strategy(&mut self) {}

    /// Called once after the last snapshot.
    fn finish(&mut self) {}
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _snapshot: &ProgressSnapshot) {}
}

/// Writes a progress line through `log` at most once per interval.
#[derive(Debug)]
pub struct LogSink {
    interval: Duration,
    last: Option<Instant>,
}

impl LogSink {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl TelemetrySink for LogSink {
    fn record(&mut self, snapshot: &ProgressSnapshot) {
        let due = self.last.is_none_or(|last| last.elapsed() >= self.interval);
        if !due {
            return;
        }
        self.last = Some(Instant::now());
        log::info!("{}", progress_line(snapshot));
    }
}

/// Terminal progress bar, one per strategy.
pub struct ProgressBarSink {
    bar: Option<ProgressBar>,
    strategy_index: Option<usize>,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        Self {
            bar: None,
            strategy_index: None,
        }
    }

    fn start_bar(snapshot: &ProgressSnapshot) -> ProgressBar {
        let bar = match snapshot.total_estimate {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
                ) {
                    bar.set_style(style.progress_chars("#>-"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) =
                    ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")
                {
                    bar.set_style(style);
                }
                bar
            }
        };
        bar.set_prefix(snapshot.strategy.clone());
        bar.println(format!("Strategy: {}", snapshot.strategy));
        bar
    }
}

impl Default for ProgressBarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for ProgressBarSink {
    fn record(&mut self, snapshot: &ProgressSnapshot) {
        if self.strategy_index != Some(snapshot.strategy_index) {
            if let Some(bar) = self.bar.take() {
                bar.finish();
            }
            self.bar = Some(Self::start_bar(snapshot));
            self.strategy_index = Some(snapshot.strategy_index);
        }
        if let Some(bar) = &self.bar {
            bar.set_position(snapshot.strategy_tested);
            bar.set_message(format!(
                "{:.0} pwd/sec, {} total",
                snapshot.rate(),
                snapshot.tested
            ));
        }
    }

    fn end_strategy(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
        self.strategy_index = None;
    }

    fn finish(&mut self) {
        self.end_strategy();
    }
}

/// One-line rendering used by [`LogSink`].
pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    let progress = match snapshot.total_estimate {
        Some(total) if total > 0 => format!(
            "{}/{} ({:5.1}%)",
            snapshot.strategy_tested,
            total,
            snapshot.strategy_tested as f64 / total as f64 * 100.0
        ),
        _ => format!("{}", snapshot.strategy_tested),
    };
    format!(
        "[{}] {} | total {} | {:.0} pwd/sec | {:.1?}",
        snapshot.strategy,
        progress,
        snapshot.tested,
        snapshot.rate(),
        snapshot.elapsed
    )
}

enum TelemetryEvent {
    Snapshot(ProgressSnapshot),
    /// Answered on the enclosed channel once the sink has handled it.
    EndStrategy(Sender<()>),
}

/// Coordinator-side handle that forwards snapshots to a sink thread.
pub struct TelemetryPublisher {
    tx: Option<Sender<TelemetryEvent>>,
    handle: Option<JoinHandle<()>>,
}

impl TelemetryPublisher {
    pub fn spawn(mut sink: Box<dyn TelemetrySink>) -> Self {
        let (tx, rx) = bounded::<TelemetryEvent>(TELEMETRY_BUFFER);
        let handle = std::thread::Builder::new()
            .name("telemetry".to_string())
            .spawn(move || {
                for event in rx.iter() {
                    match event {
                        TelemetryEvent::Snapshot(snapshot) => sink.record(&snapshot),
                        TelemetryEvent::EndStrategy(ack) => {
                            sink.end_strategy();
                            let _ = ack.send(());
                        }
                    }
                }
                sink.finish();
            })
            .map_err(|e| log::warn!("Progress reporting disabled: {}", e))
            .ok();
        Self {
            tx: handle.as_ref().map(|_| tx),
            handle,
        }
    }

    /// Never blocks. Returns false when the snapshot was dropped.
    pub fn publish(&self, snapshot: ProgressSnapshot) -> bool {
        match &self.tx {
            Some(tx) => match tx.try_send(TelemetryEvent::Snapshot(snapshot)) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
            },
            None => false,
        }
    }

    /// Deliver everything already published, then close the current
    /// strategy's display. Blocks until the sink is done.
    pub fn end_strategy(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(TelemetryEvent::EndStrategy(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Flush buffered snapshots and wait for the sink to finish.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TelemetryPublisher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
