//! Candidate orderings and the two ways of generating them.
//!
//! A [`Candidate`] stores `positions[item] = position`. It is always a
//! bijection on `0..N`: every constructor either builds one by construction or
//! checks it.

use std::fmt;

use rand::Rng;
use rand::seq::{SliceRandom, index};

use crate::error::{Error, Result};
use crate::instance::label;

/// An assignment of `N` items to `N` rack positions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Candidate {
    positions: Vec<usize>,
}

impl Candidate {
    /// Item `i` at position `i`.
    pub fn identity(n: usize) -> Self {
        Self {
            positions: (0..n).collect(),
        }
    }

    /// Uniformly random ordering (full Fisher-Yates shuffle).
    pub fn random<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut positions: Vec<usize> = (0..n).collect();
        positions.shuffle(rng);
        Self { positions }
    }

    /// Builds a candidate from `positions[item] = position`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCandidate`] unless `positions` is a permutation of `0..len`.
    pub fn from_positions(positions: Vec<usize>) -> Result<Self> {
        let c = Self { positions };
        if c.is_bijection() {
            Ok(c)
        } else {
            Err(Error::invalid_candidate(format!(
                "{:?} is not a permutation",
                c.positions
            )))
        }
    }

    /// Builds a candidate from `order[position] = item`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCandidate`] unless `order` is a permutation of `0..len`.
    pub fn from_order(order: Vec<usize>) -> Result<Self> {
        let n = order.len();
        let mut positions = vec![usize::MAX; n];
        for (pos, &item) in order.iter().enumerate() {
            if item >= n || positions[item] != usize::MAX {
                return Err(Error::invalid_candidate(format!(
                    "{order:?} is not a permutation"
                )));
            }
            positions[item] = pos;
        }
        Ok(Self { positions })
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True for the zero-item candidate.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// `positions()[item]` is the rack position of `item`.
    #[inline]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Inverse view: `order()[position]` is the item at `position`.
    pub fn order(&self) -> Vec<usize> {
        let mut order = vec![0; self.positions.len()];
        for (item, &pos) in self.positions.iter().enumerate() {
            order[pos] = item;
        }
        order
    }

    /// Item labels in rack order.
    pub fn labels(&self) -> Vec<String> {
        self.order().into_iter().map(label).collect()
    }

    /// Every position appears exactly once.
    pub fn is_bijection(&self) -> bool {
        let n = self.positions.len();
        let mut seen = vec![false; n];
        self.positions.iter().all(|&p| p < n && !std::mem::replace(&mut seen[p], true))
    }

    /// A copy with the items at two distinct, uniformly chosen positions exchanged.
    ///
    /// `self` is left untouched. Candidates with fewer than two items are returned as-is.
    pub fn perturbed<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut next = self.clone();
        if next.positions.len() >= 2 {
            let picked = index::sample(rng, next.positions.len(), 2);
            next.positions.swap(picked.index(0), picked.index(1));
        }
        next
    }
}

impl fmt::Display for Candidate {
    /// Labels in rack order. Single-character labels are concatenated,
    /// longer ones are space-separated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = self.labels();
        let sep = if labels.iter().all(|l| l.len() == 1) { "" } else { " " };
        f.write_str(&labels.join(sep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn random_candidates_are_bijections() {
        let mut rng = XorShiftRng::seed_from_u64(7);
        for n in [1, 2, 4, 15, 60] {
            for _ in 0..20 {
                let c = Candidate::random(n, &mut rng);
                assert_eq!(c.len(), n);
                assert!(c.is_bijection());
            }
        }
    }

    #[test]
    fn perturbed_swaps_exactly_two_items_and_leaves_input_alone() {
        let mut rng = XorShiftRng::seed_from_u64(11);
        let base = Candidate::random(10, &mut rng);
        let snapshot = base.clone();

        for _ in 0..100 {
            let next = base.perturbed(&mut rng);
            assert_eq!(base, snapshot);
            assert!(next.is_bijection());
            let moved = base
                .positions()
                .iter()
                .zip(next.positions())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(moved, 2);
        }
    }

    #[test]
    fn repeated_perturbation_preserves_bijection() {
        let mut rng = XorShiftRng::seed_from_u64(3);
        let mut c = Candidate::identity(26);
        for _ in 0..10_000 {
            c = c.perturbed(&mut rng);
        }
        assert!(c.is_bijection());
    }

    #[test]
    fn perturbing_a_single_item_is_a_no_op() {
        let mut rng = XorShiftRng::seed_from_u64(0);
        let c = Candidate::identity(1);
        assert_eq!(c.perturbed(&mut rng), c);
    }

    #[test]
    fn order_is_inverse_of_positions() {
        // Item 0 sits at position 5, item 4 at position 0, and so on.
        let c = Candidate::from_positions(vec![5, 4, 7, 1, 0, 3, 2, 6]).unwrap();
        assert_eq!(c.order(), vec![4, 3, 6, 5, 1, 0, 7, 2]);
        assert_eq!(c.to_string(), "EDGFBAHC");
        assert_eq!(Candidate::from_order(c.order()).unwrap(), c);
    }

    #[test]
    fn constructors_reject_non_permutations() {
        assert!(Candidate::from_positions(vec![0, 0, 1]).is_err());
        assert!(Candidate::from_positions(vec![0, 3, 1]).is_err());
        assert!(Candidate::from_order(vec![1, 1]).is_err());
        assert!(Candidate::from_order(vec![0, 2]).is_err());
    }

    #[test]
    fn display_spaces_out_numeric_labels() {
        let c = Candidate::from_order((0..54).rev().collect()).unwrap();
        let shown = c.to_string();
        assert!(shown.starts_with("53 52 z y"));
        assert!(shown.ends_with("B A"));
    }
}
