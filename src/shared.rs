//! Shared best-state: the one record every worker reconciles against.
//!
//! All fields live behind a single [`Mutex`]. Workers take the lock only at
//! reconciliation points (every few seconds), so there is no reader/writer
//! split and no lock-free fast path.
//!
//! # Reconciliation rule
//!
//! When a worker reconciles with local best score `s` at progress fraction `f`:
//!
//! 1. If `s` is strictly below the shared minimum, `s` and its candidate
//!    replace the shared best and the new-best flag is raised.
//! 2. If `s <= min` and `f` is not behind the last reported fraction, a
//!    [`ProgressEvent`] is emitted (inside the lock) and the marker advances.
//!    The flag is cleared once reported.
//! 3. The worker's evaluation delta is added to the running total.
//!
//! Rule 2 fires on ties too, so two workers holding the same best will both
//! print a line. That is intended.
//!
//! # Poisoning
//!
//! Every mutation leaves the record consistent, so a worker that panicked
//! while holding the lock does not invalidate it. The lock is recovered with
//! [`PoisonError::into_inner`].

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::candidate::Candidate;

/// One line of the progress table.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    /// Reporting worker.
    pub worker_id: usize,
    /// Time since coordinator start.
    pub elapsed: Duration,
    /// Progress in `[0, 1]`.
    pub fraction: f64,
    /// The reported score, equal to the shared minimum.
    pub best_score: u64,
    /// True if this is the first report since the shared minimum improved.
    pub is_new_best: bool,
}

/// Contents of the shared record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BestState {
    /// Best score from any worker. `None` until the first reconciliation.
    pub min_score: Option<u64>,
    /// Candidate achieving `min_score`.
    pub best_candidate: Option<Candidate>,
    /// Progress fraction at which `min_score` was installed.
    pub best_found_fraction: f64,
    /// Fraction of the last emitted progress line.
    pub last_reported_fraction: f64,
    /// Evaluations flushed by all workers.
    pub total_evaluations: u64,
    /// Raised on improvement, cleared when reported.
    pub new_best: bool,
}

/// What a worker brings to a reconciliation.
#[derive(Clone, Copy, Debug)]
pub struct LocalReport<'a> {
    /// Reporting worker.
    pub worker_id: usize,
    /// The worker's best score so far.
    pub best_score: u64,
    /// The candidate achieving it.
    pub best: &'a Candidate,
    /// The worker's progress fraction.
    pub fraction: f64,
    /// Time since coordinator start.
    pub elapsed: Duration,
    /// Evaluations since the worker's previous flush.
    pub evaluations: u64,
}

/// Result of one reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// The local best replaced the shared best.
    pub improved: bool,
    /// A progress event was emitted.
    pub reported: bool,
}

/// Mutex-guarded [`BestState`], shared by reference with every worker.
#[derive(Debug, Default)]
pub struct SharedBest {
    inner: Mutex<BestState>,
}

impl SharedBest {
    /// Empty record: no best yet, nothing reported.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BestState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merges a worker's local best into the shared record.
    ///
    /// `emit` runs while the lock is held, so progress lines from different
    /// workers never interleave.
    pub fn reconcile(&self, report: &LocalReport<'_>, emit: impl FnOnce(&ProgressEvent)) -> Reconciled {
        let mut state = self.lock();
        let mut outcome = Reconciled::default();

        let beats = state.min_score.is_none_or(|min| report.best_score < min);
        if beats {
            state.min_score = Some(report.best_score);
            state.best_candidate = Some(report.best.clone());
            state.best_found_fraction = report.fraction;
            state.new_best = true;
            outcome.improved = true;
        }

        let at_best = state.min_score.is_some_and(|min| report.best_score <= min);
        if at_best && report.fraction >= state.last_reported_fraction {
            emit(&ProgressEvent {
                worker_id: report.worker_id,
                elapsed: report.elapsed,
                fraction: report.fraction,
                best_score: report.best_score,
                is_new_best: state.new_best,
            });
            state.last_reported_fraction = report.fraction;
            state.new_best = false;
            outcome.reported = true;
        }

        state.total_evaluations += report.evaluations;
        outcome
    }

    /// Adds evaluations without touching the best. Used for the final flush.
    pub fn add_evaluations(&self, count: u64) {
        self.lock().total_evaluations += count;
    }

    /// Current shared minimum.
    pub fn min_score(&self) -> Option<u64> {
        self.lock().min_score
    }

    /// Clone of the current shared best candidate.
    pub fn best_candidate(&self) -> Option<Candidate> {
        self.lock().best_candidate.clone()
    }

    /// Copy of the whole record.
    pub fn snapshot(&self) -> BestState {
        self.lock().clone()
    }
}
