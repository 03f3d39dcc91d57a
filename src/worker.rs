//! Worker loop: one independent search chain.
//!
//! A worker owns its incumbent, its local best, its timers and its RNG. It
//! touches shared state only through [`SharedBest`], and only when a
//! reconciliation or an intensifying restart is due.
//!
//! After every iteration [`Worker::tick`] runs, in this order:
//!
//! 1. reconciliation, if `update_interval` has elapsed since the last one
//!    (the timer advances by exactly one interval, so an overrun makes the
//!    next check fire immediately),
//! 2. restart, if `restart_interval` has elapsed since the last restart
//!    (the timer resets to `now`),
//! 3. the termination check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::candidate::Candidate;
use crate::config::{SearchConfig, Strategy};
use crate::instance::Instance;
use crate::shared::{LocalReport, ProgressEvent, SharedBest};

/// Callback for progress lines. Called with the shared lock held.
pub type Reporter<'a> = &'a (dyn Fn(&ProgressEvent) + Sync);

/// Everything a worker borrows from the coordinator.
#[derive(Clone, Copy)]
pub struct WorkerContext<'a> {
    /// Problem instance, read-only.
    pub instance: &'a Instance,
    /// Validated configuration.
    pub config: &'a SearchConfig,
    /// Shared best-state.
    pub shared: &'a SharedBest,
    /// Coordinator start time. Deadlines and progress are measured from here.
    pub start: Instant,
    /// Cooperative cancellation flag.
    pub cancel: &'a AtomicBool,
    /// Progress line sink.
    pub reporter: Reporter<'a>,
    /// Samples this worker may draw under [`Strategy::RandomSample`].
    pub case_share: u64,
}

/// Worker lifecycle.
///
/// `Reconciling` and `Restarting` are transient: they hold only inside
/// [`Worker::tick`], which always leaves the worker `Running` or `Terminated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Generating and scoring candidates.
    Running,
    /// Holding the shared lock.
    Reconciling,
    /// Replacing the incumbent.
    Restarting,
    /// Past the deadline, out of budget, or cancelled.
    Terminated,
}

/// What a worker hands back to the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerOutcome {
    /// Worker index.
    pub worker_id: usize,
    /// Best score this worker saw.
    pub best_score: u64,
    /// Candidate achieving `best_score`.
    pub best: Candidate,
    /// Candidates this worker scored.
    pub evaluations: u64,
    /// Restarts performed.
    pub restarts: u64,
}

/// One search chain.
pub struct Worker<'a> {
    id: usize,
    ctx: WorkerContext<'a>,
    rng: SmallRng,
    state: WorkerState,
    incumbent: Candidate,
    incumbent_score: u64,
    best: Candidate,
    best_score: u64,
    last_reconcile: Instant,
    last_restart: Instant,
    evaluations: u64,
    unflushed: u64,
    restarts: u64,
}

impl<'a> Worker<'a> {
    /// Creates a worker with a fresh random incumbent. The initial evaluation counts.
    pub fn new(id: usize, seed: u64, ctx: WorkerContext<'a>) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let incumbent = Candidate::random(ctx.instance.item_count(), &mut rng);
        let score = ctx.instance.score(&incumbent);
        Self {
            id,
            ctx,
            rng,
            state: WorkerState::Running,
            best: incumbent.clone(),
            best_score: score,
            incumbent,
            incumbent_score: score,
            last_reconcile: ctx.start,
            last_restart: ctx.start,
            evaluations: 1,
            unflushed: 1,
            restarts: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Best score this worker has seen.
    pub fn best_score(&self) -> u64 {
        self.best_score
    }

    /// Runs until termination and returns the local best.
    pub fn run(mut self) -> WorkerOutcome {
        log::debug!(
            "worker: id={} start strategy={} score={}",
            self.id,
            self.ctx.config.strategy,
            self.best_score
        );

        if self.should_stop(Instant::now()) {
            self.state = WorkerState::Terminated;
        }
        while self.state != WorkerState::Terminated {
            self.step();
            self.tick(Instant::now());
        }

        self.finish()
    }

    /// One iteration: generate, score, keep if strictly better.
    pub fn step(&mut self) {
        let candidate = match self.ctx.config.strategy {
            Strategy::LocalSearch => self.incumbent.perturbed(&mut self.rng),
            Strategy::RandomSample => Candidate::random(self.ctx.instance.item_count(), &mut self.rng),
        };
        let score = self.ctx.instance.score(&candidate);
        self.count_evaluation();

        if score < self.best_score {
            self.best_score = score;
            self.best.clone_from(&candidate);
        }
        if score < self.incumbent_score {
            self.incumbent = candidate;
            self.incumbent_score = score;
        }
    }

    /// Post-iteration bookkeeping: reconcile, then restart, then check termination.
    pub fn tick(&mut self, now: Instant) {
        let cfg = self.ctx.config;

        if now.saturating_duration_since(self.last_reconcile) >= cfg.update_interval {
            self.reconcile(now);
            self.last_reconcile += cfg.update_interval;
        }

        if cfg.strategy == Strategy::LocalSearch
            && now.saturating_duration_since(self.last_restart) >= cfg.restart_interval
        {
            self.restart();
            self.last_restart = now;
        }

        self.state = if self.should_stop(now) {
            WorkerState::Terminated
        } else {
            WorkerState::Running
        };
    }

    /// Progress in `[0, 1]`: elapsed share of `max_time`, or share of the case
    /// budget used when random sampling.
    pub fn fraction(&self, now: Instant) -> f64 {
        let cfg = self.ctx.config;
        let raw = match cfg.strategy {
            Strategy::LocalSearch if cfg.max_time.is_zero() => 1.0,
            Strategy::LocalSearch => self.elapsed(now).as_secs_f64() / cfg.max_time.as_secs_f64(),
            Strategy::RandomSample => self.evaluations as f64 / self.ctx.case_share as f64,
        };
        raw.clamp(0.0, 1.0)
    }

    fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.ctx.start)
    }

    fn should_stop(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.ctx.config.deadline()
            || self.ctx.cancel.load(Ordering::Relaxed)
            || (self.ctx.config.strategy == Strategy::RandomSample
                && self.evaluations >= self.ctx.case_share)
    }

    #[inline]
    fn count_evaluation(&mut self) {
        self.evaluations += 1;
        self.unflushed += 1;
    }

    fn reconcile(&mut self, now: Instant) {
        self.state = WorkerState::Reconciling;
        let fraction = self.fraction(now);
        let report = LocalReport {
            worker_id: self.id,
            best_score: self.best_score,
            best: &self.best,
            fraction,
            elapsed: self.elapsed(now),
            evaluations: self.unflushed,
        };
        let reporter = self.ctx.reporter;
        let outcome = self.ctx.shared.reconcile(&report, |event| reporter(event));
        self.unflushed = 0;

        if outcome.improved {
            log::debug!(
                "worker: id={} shared best improved score={} fraction={fraction:.4}",
                self.id,
                self.best_score
            );
        }
        self.state = WorkerState::Running;
    }

    fn restart(&mut self) {
        self.state = WorkerState::Restarting;
        let fresh = self.rng.random_bool(self.ctx.config.restart_probability);
        self.incumbent = if fresh {
            Candidate::random(self.ctx.instance.item_count(), &mut self.rng)
        } else {
            self.ctx
                .shared
                .best_candidate()
                .unwrap_or_else(|| self.best.clone())
        };
        self.incumbent_score = self.ctx.instance.score(&self.incumbent);
        self.count_evaluation();
        if self.incumbent_score < self.best_score {
            self.best_score = self.incumbent_score;
            self.best.clone_from(&self.incumbent);
        }
        self.restarts += 1;

        log::trace!(
            "worker: id={} restart fresh={fresh} score={}",
            self.id,
            self.incumbent_score
        );
        self.state = WorkerState::Running;
    }

    fn finish(self) -> WorkerOutcome {
        self.ctx.shared.add_evaluations(self.unflushed);
        log::debug!(
            "worker: id={} done score={} evaluations={} restarts={}",
            self.id,
            self.best_score,
            self.evaluations,
            self.restarts
        );
        WorkerOutcome {
            worker_id: self.id,
            best_score: self.best_score,
            best: self.best,
            evaluations: self.evaluations,
            restarts: self.restarts,
        }
    }
}

/// Seed for worker `worker_id`, derived from the run's base seed.
pub fn worker_seed(base_seed: u64, worker_id: usize) -> u64 {
    splitmix64(base_seed ^ worker_id as u64)
}

/// SplitMix64 mixer for deriving per-worker seeds from a base seed.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ============================================================================
// Tests
// ============================================================================
