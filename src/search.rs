//! Coordinator: runs one worker per thread, joins them, and picks the global best.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use crossbeam::channel;

use crate::candidate::Candidate;
use crate::config::{SearchConfig, Strategy};
use crate::error::Result;
use crate::instance::Instance;
use crate::shared::SharedBest;
use crate::worker::{Reporter, Worker, WorkerContext, WorkerOutcome, worker_seed};

/// Aggregated result of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    /// Number of items in the instance.
    pub item_count: usize,
    /// Global best score and candidate. `None` only if no worker completed.
    pub best: Option<(u64, Candidate)>,
    /// Candidates scored across all workers.
    pub total_evaluations: u64,
    /// Wall time from coordinator start to join.
    pub elapsed: Duration,
    /// Workers started.
    pub workers_spawned: usize,
    /// Workers that returned a result.
    pub workers_completed: usize,
    /// Strategy used.
    pub strategy: Strategy,
    /// Total sample budget under [`Strategy::RandomSample`].
    pub case_budget: Option<u64>,
    /// Per-worker results, ordered by worker id.
    pub workers: Vec<WorkerOutcome>,
}

impl SearchOutcome {
    /// Best score, if any worker completed.
    pub fn best_score(&self) -> Option<u64> {
        self.best.as_ref().map(|(score, _)| *score)
    }

    /// Evaluations per second. `None` when no time elapsed.
    pub fn throughput(&self) -> Option<f64> {
        if self.elapsed.is_zero() {
            None
        } else {
            Some(self.total_evaluations as f64 / self.elapsed.as_secs_f64())
        }
    }
}

/// Runs a parallel search and blocks until every worker has returned.
///
/// # Errors
/// Returns an error if `cfg` is invalid or the worker pool cannot be started.
pub fn run_search(instance: &Instance, cfg: &SearchConfig, reporter: Reporter<'_>) -> Result<SearchOutcome> {
    run_search_with_cancel(instance, cfg, reporter, &AtomicBool::new(false))
}

/// Like [`run_search`], but workers also stop once `cancel` is set.
///
/// # Errors
/// Returns an error if `cfg` is invalid or the worker pool cannot be started.
pub fn run_search_with_cancel(
    instance: &Instance,
    cfg: &SearchConfig,
    reporter: Reporter<'_>,
    cancel: &AtomicBool,
) -> Result<SearchOutcome> {
    cfg.validate()?;
    let base_seed = cfg.seed.unwrap_or_else(rand::random::<u64>);
    let case_budget = match cfg.strategy {
        Strategy::LocalSearch => None,
        Strategy::RandomSample => Some(cfg.case_budget.unwrap_or_else(|| instance.permutation_count())),
    };
    // Every sampling worker scores at least its seed candidate.
    let workers = match case_budget {
        Some(budget) => cfg.worker_count().min(usize::try_from(budget).unwrap_or(usize::MAX)),
        None => cfg.worker_count(),
    };

    log::info!(
        "search: items={} relations={} workers={workers} strategy={} seed={base_seed}",
        instance.item_count(),
        instance.relations().len(),
        cfg.strategy
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("search-worker-{i}"))
        .build()?;

    let shared = SharedBest::new();
    let start = Instant::now();
    let ctx = WorkerContext {
        instance,
        config: cfg,
        shared: &shared,
        start,
        cancel,
        reporter,
        case_share: u64::MAX,
    };
    let (tx, rx) = channel::unbounded();

    pool.scope(|s| {
        for worker_id in 0..workers {
            let tx = tx.clone();
            let ctx = WorkerContext {
                case_share: case_budget.map_or(u64::MAX, |budget| case_share(budget, workers, worker_id)),
                ..ctx
            };
            s.spawn(move |_| {
                let seed = worker_seed(base_seed, worker_id);
                let run = panic::catch_unwind(AssertUnwindSafe(|| Worker::new(worker_id, seed, ctx).run()));
                match run {
                    Ok(outcome) => {
                        // The receiver outlives the scope.
                        let _ = tx.send(outcome);
                    }
                    Err(_) => log::error!("search: worker {worker_id} panicked, excluded from results"),
                }
            });
        }
    });
    drop(tx);
    let elapsed = start.elapsed();

    let mut outcomes: Vec<WorkerOutcome> = rx.iter().collect();
    outcomes.sort_by_key(|o| o.worker_id);
    let best = aggregate(&outcomes).map(|o| (o.best_score, o.best.clone()));
    let total_evaluations = shared.snapshot().total_evaluations;

    log::info!(
        "search: done completed={}/{workers} best={:?} evaluations={total_evaluations} elapsed={:.3}s",
        outcomes.len(),
        best.as_ref().map(|(score, _)| *score),
        elapsed.as_secs_f64()
    );

    Ok(SearchOutcome {
        item_count: instance.item_count(),
        best,
        total_evaluations,
        elapsed,
        workers_spawned: workers,
        workers_completed: outcomes.len(),
        strategy: cfg.strategy,
        case_budget,
        workers: outcomes,
    })
}

/// Cases worker `worker_id` draws when `budget` is split across `workers`.
///
/// The split is exact: the first `budget % workers` workers take one extra case.
pub fn case_share(budget: u64, workers: usize, worker_id: usize) -> u64 {
    let workers = workers.max(1) as u64;
    let extra = u64::from((worker_id as u64) < budget % workers);
    budget / workers + extra
}

/// Global best over worker results: lowest score, ties to the first in slice order.
pub fn aggregate(outcomes: &[WorkerOutcome]) -> Option<&WorkerOutcome> {
    outcomes
        .iter()
        .reduce(|best, o| if o.best_score < best.best_score { o } else { best })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::instance::Relation;
    use crate::shared::ProgressEvent;
    use std::sync::Mutex;

    fn four_items() -> Instance {
        Instance::new(vec![
            Relation::new(0, 1, 2),
            Relation::new(1, 2, 1),
            Relation::new(0, 3, 3),
        ])
        .unwrap()
    }

    fn quiet(_: &ProgressEvent) {}

    fn short_run(workers: usize) -> SearchConfig {
        SearchConfig {
            max_time: Duration::from_millis(150),
            buffer: Duration::from_millis(10),
            update_interval: Duration::from_millis(20),
            restart_interval: Duration::from_millis(50),
            workers: Some(workers),
            seed: Some(12345),
            ..Default::default()
        }
    }

    fn outcome(worker_id: usize, best_score: u64) -> WorkerOutcome {
        WorkerOutcome {
            worker_id,
            best_score,
            best: Candidate::identity(3),
            evaluations: 1,
            restarts: 0,
        }
    }

    #[test]
    fn aggregate_breaks_ties_by_lowest_worker_index() {
        let outcomes = [outcome(0, 9), outcome(1, 4), outcome(2, 4), outcome(3, 7)];
        assert_eq!(aggregate(&outcomes).unwrap().worker_id, 1);
    }

    #[test]
    fn aggregate_skips_missing_workers() {
        // Worker 1 panicked and is absent.
        let outcomes = [outcome(0, 9), outcome(2, 5)];
        assert_eq!(aggregate(&outcomes).unwrap().worker_id, 2);
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn aggregate_over_one_worker_is_that_worker() {
        let outcomes = [outcome(0, 11)];
        assert_eq!(aggregate(&outcomes).unwrap().best_score, 11);
    }

    #[test]
    fn single_worker_finds_four_item_optimum() {
        let inst = four_items();
        let cfg = short_run(1);
        let events = Mutex::new(Vec::new());
        let record = |e: &ProgressEvent| events.lock().unwrap().push(e.clone());

        let out = run_search(&inst, &cfg, &record).unwrap();
        assert_eq!(out.workers_spawned, 1);
        assert_eq!(out.workers_completed, 1);
        assert_eq!(out.best_score(), Some(6));
        let (score, best) = out.best.as_ref().unwrap();
        assert_eq!(inst.score(best), *score);
        assert_eq!(out.total_evaluations, out.workers[0].evaluations);
        assert!(out.throughput().is_some());

        let events = events.into_inner().unwrap();
        assert!(!events.is_empty());
        assert!(events[0].is_new_best);
        for pair in events.windows(2) {
            assert!(pair[0].fraction <= pair[1].fraction);
            assert!(pair[1].best_score <= pair[0].best_score);
        }
        assert!(events.iter().all(|e| (0.0..=1.0).contains(&e.fraction)));
    }

    #[test]
    fn multi_worker_result_is_the_minimum_over_workers() {
        let inst = Instance::sample().unwrap();
        let cfg = short_run(4);
        let out = run_search(&inst, &cfg, &quiet).unwrap();

        assert_eq!(out.workers_completed, 4);
        let ids: Vec<usize> = out.workers.iter().map(|w| w.worker_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        let (score, best) = out.best.as_ref().unwrap();
        assert!(best.is_bijection());
        assert_eq!(inst.score(best), *score);
        assert!(out.workers.iter().all(|w| w.best_score >= *score));

        let summed: u64 = out.workers.iter().map(|w| w.evaluations).sum();
        assert_eq!(out.total_evaluations, summed);
    }

    #[test]
    fn zero_time_budget_still_reports() {
        let inst = Instance::sample().unwrap();
        let cfg = SearchConfig {
            max_time: Duration::ZERO,
            buffer: Duration::ZERO,
            workers: Some(3),
            ..Default::default()
        };
        let out = run_search(&inst, &cfg, &quiet).unwrap();
        assert_eq!(out.workers_completed, 3);
        assert_eq!(out.total_evaluations, 3);
        let (score, best) = out.best.unwrap();
        assert_eq!(inst.score(&best), score);
    }

    #[test]
    fn random_sampling_spends_the_case_budget() {
        let inst = four_items();
        let cfg = SearchConfig {
            strategy: Strategy::RandomSample,
            max_time: Duration::from_secs(30),
            workers: Some(3),
            seed: Some(1),
            ..Default::default()
        };
        let out = run_search(&inst, &cfg, &quiet).unwrap();
        assert_eq!(out.case_budget, Some(24));
        assert_eq!(out.total_evaluations, 24);
        assert!(out.workers.iter().all(|w| w.evaluations == 8 && w.restarts == 0));
    }

    #[test]
    fn case_share_splits_the_budget_exactly() {
        let shares: Vec<u64> = (0..4).map(|i| case_share(10, 4, i)).collect();
        assert_eq!(shares, vec![3, 3, 2, 2]);
        assert_eq!((0..7).map(|i| case_share(24, 7, i)).sum::<u64>(), 24);
        assert_eq!(case_share(5, 1, 0), 5);
    }

    fn sampling(case_budget: u64, workers: usize) -> SearchConfig {
        SearchConfig {
            strategy: Strategy::RandomSample,
            max_time: Duration::from_secs(30),
            workers: Some(workers),
            case_budget: Some(case_budget),
            seed: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn uneven_case_budget_is_spent_exactly() {
        let inst = Instance::sample().unwrap();
        let out = run_search(&inst, &sampling(10, 4), &quiet).unwrap();
        assert_eq!(out.workers_spawned, 4);
        assert_eq!(out.total_evaluations, 10);
        let per_worker: Vec<u64> = out.workers.iter().map(|w| w.evaluations).collect();
        assert_eq!(per_worker, vec![3, 3, 2, 2]);
    }

    #[test]
    fn case_budget_below_worker_count_spawns_fewer_workers() {
        let inst = Instance::sample().unwrap();
        let out = run_search(&inst, &sampling(2, 4), &quiet).unwrap();
        assert_eq!(out.workers_spawned, 2);
        assert_eq!(out.workers_completed, 2);
        assert_eq!(out.total_evaluations, 2);
        assert!(out.best.is_some());
    }

    #[test]
    fn cancellation_stops_workers_early() {
        let inst = four_items();
        let cfg = SearchConfig {
            max_time: Duration::from_secs(60),
            workers: Some(2),
            ..Default::default()
        };
        let cancel = AtomicBool::new(true);
        let out = run_search_with_cancel(&inst, &cfg, &quiet, &cancel).unwrap();
        assert_eq!(out.workers_completed, 2);
        assert_eq!(out.total_evaluations, 2);
        assert!(out.elapsed < Duration::from_secs(60));
    }

    #[test]
    fn panicked_worker_is_excluded() {
        let inst = four_items();
        let cfg = short_run(1);
        fn explode(_: &ProgressEvent) {
            panic!("reporter failure");
        }

        let out = run_search(&inst, &cfg, &explode).unwrap();
        assert_eq!(out.workers_spawned, 1);
        assert_eq!(out.workers_completed, 0);
        assert!(out.best.is_none());
        assert!(out.workers.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let inst = four_items();
        let cfg = SearchConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            run_search(&inst, &cfg, &quiet),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn throughput_is_undefined_for_zero_elapsed() {
        let out = SearchOutcome {
            item_count: 3,
            best: None,
            total_evaluations: 10,
            elapsed: Duration::ZERO,
            workers_spawned: 1,
            workers_completed: 0,
            strategy: Strategy::LocalSearch,
            case_budget: None,
            workers: Vec::new(),
        };
        assert!(out.throughput().is_none());
    }
}
