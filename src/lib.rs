//! # Cable Search
//!
//! Parallel local search for the device order that minimizes total cable
//! length in a linear rack.
//!
//! This crate provides:
//! - A validated problem [`Instance`](instance::Instance) with an exact,
//!   overflow-free evaluator: `Σ cables * |pos(a) - pos(b)|`.
//! - Permutation [`Candidate`](candidate::Candidate)s with pairwise-swap
//!   perturbation and uniform reshuffling.
//! - A mutex-guarded shared best that workers reconcile against on a fixed,
//!   drift-free cadence.
//! - A coordinator that runs one greedy hill-climbing (or random-sampling)
//!   worker per thread, with periodic diversifying or intensifying restarts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use cable_search::prelude::*;
//!
//! let instance = Instance::sample().unwrap();
//! let cfg = SearchConfig {
//!     max_time: Duration::from_secs(10),
//!     seed: Some(12345),
//!     ..Default::default()
//! };
//! let print = |e: &ProgressEvent| println!("{}", ProgressLine(e));
//! let outcome = run_search(&instance, &cfg, &print).unwrap();
//! println!("{}", Summary(&outcome));
//! ```
//!
//! ## Validating the Evaluator
//!
//! ```
//! use cable_search::validate::validate_known_instances;
//!
//! validate_known_instances().expect("bundled checks should pass");
//! ```
//!
//! ## Working with Instances Directly
//!
//! ```
//! use cable_search::prelude::*;
//!
//! let rack = Instance::parse("A B 2\nB C 1\nA D 3\n").unwrap();
//! assert_eq!(rack.item_count(), 4);
//!
//! // `order[position] = item`
//! let abcd = Candidate::from_order(vec![0, 1, 2, 3]).unwrap();
//! let dabc = Candidate::from_order(vec![3, 0, 1, 2]).unwrap();
//! assert_eq!(rack.score(&abcd), 12);
//! assert_eq!(rack.score(&dabc), 6);
//! assert_eq!(dabc.to_string(), "DABC");
//! ```
//!
//! ## Modules
//!
//! - [`instance`]: Instances, the evaluator, parsing and item labels.
//! - [`candidate`]: Orderings and the perturb/fresh generators.
//! - [`shared`]: The lock-guarded shared best and its reconciliation rule.
//! - [`worker`]: The per-thread search loop.
//! - [`search`]: The coordinator.
//! - [`report`]: Progress table and summary formatting.
//! - [`config`]: Configuration, config files and command-line flags.
//! - [`validate`]: Deterministic self-checks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod candidate;
pub mod config;
pub mod error;
pub mod instance;
pub mod logging;
pub mod report;
pub mod search;
pub mod shared;
pub mod validate;
pub mod worker;

pub use error::{Error, Result};

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::candidate::Candidate;
    pub use crate::config::{SearchConfig, Strategy};
    pub use crate::error::{Error, Result};
    pub use crate::instance::{Instance, Relation};
    pub use crate::report::{ProgressLine, Summary};
    pub use crate::search::{SearchOutcome, run_search};
    pub use crate::shared::ProgressEvent;
    pub use crate::validate::validate_known_instances;
}
