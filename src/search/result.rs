//! Search result types and statistics

use std::time::Duration;

/// Answer for one dispatched batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub batch_id: u64,
    pub success: bool,
    /// The candidate that opened the document, when `success` is true.
    pub matched: Option<String>,
    /// Candidates actually tried. Stops at the match, so it can be shorter
    /// than the batch.
    pub tested: u64,
    /// Attempts that failed for reasons unrelated to the password.
    pub transient_errors: u64,
}

impl VerificationResult {
    pub fn no_match(batch_id: u64, tested: u64, transient_errors: u64) -> Self {
        Self {
            batch_id,
            success: false,
            matched: None,
            tested,
            transient_errors,
        }
    }

    pub fn matched(batch_id: u64, candidate: String, tested: u64, transient_errors: u64) -> Self {
        Self {
            batch_id,
            success: true,
            matched: Some(candidate),
            tested,
            transient_errors,
        }
    }
}

/// Aggregate counters for one search, owned by the coordinator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStatistics {
    /// Total time spent searching
    pub elapsed_time: Duration,
    /// Number of candidates handed to the verifier
    pub candidates_tested: u64,
    pub batches_dispatched: u64,
    pub batches_completed: u64,
    /// Batches dropped from the queue after cancellation
    pub batches_skipped: u64,
    pub transient_errors: u64,
    pub strategies_run: u64,
    /// Strategies declined at the confirmation gate or unavailable
    pub strategies_skipped: u64,
}

impl SearchStatistics {
    /// Get candidates tested per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.candidates_tested as f64 / secs
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Time: {:.2?}\n", self.elapsed_time));
        s.push_str(&format!("Candidates tested: {}\n", self.candidates_tested));
        s.push_str(&format!(
            "Throughput: {:.0} candidates/sec\n",
            self.throughput()
        ));
        s.push_str(&format!(
            "Strategies run: {} (skipped: {})\n",
            self.strategies_run, self.strategies_skipped
        ));
        s.push_str(&format!(
            "Batches: {} dispatched, {} completed, {} skipped\n",
            self.batches_dispatched, self.batches_completed, self.batches_skipped
        ));
        if self.transient_errors > 0 {
            s.push_str(&format!(
                "Transient verifier errors: {}\n",
                self.transient_errors
            ));
        }
        s
    }
}

/// Terminal value of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found {
        candidate: String,
        /// Description of the strategy that produced the match
        strategy: String,
        statistics: SearchStatistics,
    },
    NotFound {
        statistics: SearchStatistics,
    },
    /// Stopped by the caller before the plan was exhausted.
    Interrupted {
        statistics: SearchStatistics,
    },
}

impl SearchOutcome {
    pub fn statistics(&self) -> &SearchStatistics {
        match self {
            SearchOutcome::Found { statistics, .. }
            | SearchOutcome::NotFound { statistics }
            | SearchOutcome::Interrupted { statistics } => statistics,
        }
    }

    pub fn total_tested(&self) -> u64 {
        self.statistics().candidates_tested
    }

    pub fn elapsed(&self) -> Duration {
        self.statistics().elapsed_time
    }

    pub fn found(&self) -> Option<&str> {
        match self {
            SearchOutcome::Found { candidate, .. } => Some(candidate),
            _ => None,
        }
    }
}

impl std::fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.statistics();
        match self {
            SearchOutcome::Found {
                candidate,
                strategy,
                ..
            } => {
                writeln!(f, "Password found: '{}'", candidate)?;
                writeln!(f, "Strategy: {}", strategy)?;
            }
            SearchOutcome::NotFound { .. } => {
                writeln!(f, "Password not found.")?;
            }
            SearchOutcome::Interrupted { .. } => {
                writeln!(f, "Search interrupted.")?;
            }
        }
        writeln!(
            f,
            "Tested {} candidates in {:.2?} ({:.0} candidates/sec)",
            stats.candidates_tested,
            stats.elapsed_time,
            stats.throughput()
        )
    }
}
