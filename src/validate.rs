//! Fast deterministic self-checks of the evaluator against known scores.

use crate::candidate::Candidate;
use crate::error::{Error, Result};
use crate::instance::{Instance, Relation};

/// Largest instance [`exhaustive_minimum`] will enumerate.
pub const EXHAUSTIVE_LIMIT: usize = 10;

// ============================================================================
// Public API
// ============================================================================

/// Checks the evaluator and the bundled sample:
/// - the four-item rack scores 12 for `ABCD` and 6 for `DABC`, and 6 is optimal
/// - the bundled 15-device rack parses and scores 182 in identity order
///
/// # Errors
/// Returns an error describing the first mismatch.
pub fn validate_known_instances() -> Result<()> {
    let four = four_item_rack()?;
    expect_score(&four, &[0, 1, 2, 3], 12, "four-item ABCD")?;
    expect_score(&four, &[3, 0, 1, 2], 6, "four-item DABC")?;
    match exhaustive_minimum(&four) {
        Some((6, _)) => {}
        other => {
            return Err(Error::other(format!(
                "four-item optimum: expected 6, got {:?}",
                other.map(|(s, _)| s)
            )));
        }
    }

    let sample = Instance::sample()?;
    if sample.item_count() != 15 || sample.relations().len() != 25 {
        return Err(Error::other(format!(
            "bundled rack: expected 15 devices and 25 relations, got {} and {}",
            sample.item_count(),
            sample.relations().len()
        )));
    }
    let identity: Vec<usize> = (0..15).collect();
    expect_score(&sample, &identity, 182, "bundled rack identity order")?;
    Ok(())
}

/// Exact minimum by enumerating every ordering (Heap's algorithm).
///
/// Returns `None` for instances larger than [`EXHAUSTIVE_LIMIT`] items.
pub fn exhaustive_minimum(instance: &Instance) -> Option<(u64, Candidate)> {
    let n = instance.item_count();
    if n > EXHAUSTIVE_LIMIT {
        return None;
    }

    let mut positions: Vec<usize> = (0..n).collect();
    let mut best = score_positions(instance, &positions)?;
    let mut c = vec![0usize; n];
    let mut i = 1;
    while i < n {
        if c[i] < i {
            let j = if i.is_multiple_of(2) { 0 } else { c[i] };
            positions.swap(j, i);
            if let Some(next) = score_positions(instance, &positions)
                && next.0 < best.0
            {
                best = next;
            }
            c[i] += 1;
            i = 1;
        } else {
            c[i] = 0;
            i += 1;
        }
    }
    Some(best)
}

// ============================================================================
// Internal
// ============================================================================

fn four_item_rack() -> Result<Instance> {
    Instance::new(vec![
        Relation::new(0, 1, 2),
        Relation::new(1, 2, 1),
        Relation::new(0, 3, 3),
    ])
}

fn score_positions(instance: &Instance, positions: &[usize]) -> Option<(u64, Candidate)> {
    let c = Candidate::from_positions(positions.to_vec()).ok()?;
    Some((instance.score(&c), c))
}

fn expect_score(instance: &Instance, order: &[usize], expected: u64, name: &str) -> Result<()> {
    let c = Candidate::from_order(order.to_vec())?;
    let got = instance.score(&c);
    if got != expected {
        return Err(Error::other(format!("{name}: expected score {expected}, got {got}")));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
