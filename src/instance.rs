//! Problem instance: devices in a rack and the cable bundles between them.
//!
//! Items are identified by index `0..N`. For display they are labelled
//! `A`..`Z` then `a`..`z`; past 52 items the decimal index is used instead.
//!
//! The evaluator, [`Instance::score`], sums `weight * |pos(a) - pos(b)|` over
//! every relation. Construction checks that the worst possible score fits in a
//! `u64`, so scoring never overflows.

use std::collections::HashSet;
use std::path::Path;

use crate::candidate::Candidate;
use crate::error::{Error, Result};

/// Largest supported item count. Indices above `MAX_ITEMS - 1` are rejected.
pub const MAX_ITEMS: usize = 1 << 16;

const SAMPLE: &str = include_str!("../data/cables_15.txt");

// ============================================================================
// Labels
// ============================================================================

/// Display label for an item index.
pub fn label(item: usize) -> String {
    match item {
        0..26 => char::from(b'A' + item as u8).to_string(),
        26..52 => char::from(b'a' + (item - 26) as u8).to_string(),
        _ => item.to_string(),
    }
}

/// Parses an item token: a single letter label or a decimal index.
pub fn parse_label(token: &str) -> Option<usize> {
    if let [c] = token.as_bytes()
        && c.is_ascii_alphabetic()
    {
        return Some(if c.is_ascii_uppercase() {
            usize::from(c - b'A')
        } else {
            usize::from(c - b'a') + 26
        });
    }
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse().ok();
    }
    None
}

// ============================================================================
// Instance
// ============================================================================

/// A weighted relation between two items (cables running from `a` to `b`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Relation {
    /// First item.
    pub a: usize,
    /// Second item.
    pub b: usize,
    /// Number of cables.
    pub weight: u64,
}

impl Relation {
    /// Creates a relation.
    pub const fn new(a: usize, b: usize, weight: u64) -> Self {
        Self { a, b, weight }
    }
}

/// A validated problem instance. Read-only once built and shared by all workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    relations: Vec<Relation>,
    item_count: usize,
}

impl Instance {
    /// Builds an instance from relations. The item count is the largest index + 1.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInstance`] if the list is empty, an item relates
    /// to itself, an ordered pair repeats, an index is `>= MAX_ITEMS`, or the
    /// worst-case score would overflow.
    pub fn new(relations: Vec<Relation>) -> Result<Self> {
        if relations.is_empty() {
            return Err(Error::invalid_instance("no relations"));
        }

        let mut seen = HashSet::with_capacity(relations.len());
        let mut max_item = 0;
        for r in &relations {
            if r.a == r.b {
                return Err(Error::invalid_instance(format!(
                    "item {} is related to itself",
                    label(r.a)
                )));
            }
            if r.a >= MAX_ITEMS || r.b >= MAX_ITEMS {
                return Err(Error::invalid_instance(format!(
                    "item index {} out of range (max {})",
                    r.a.max(r.b),
                    MAX_ITEMS - 1
                )));
            }
            if !seen.insert((r.a, r.b)) {
                return Err(Error::invalid_instance(format!(
                    "duplicate relation {} -> {}",
                    label(r.a),
                    label(r.b)
                )));
            }
            max_item = max_item.max(r.a).max(r.b);
        }

        let item_count = max_item + 1;
        let span = (item_count - 1) as u64;
        relations
            .iter()
            .try_fold(0u64, |acc, r| r.weight.checked_mul(span)?.checked_add(acc))
            .ok_or_else(|| Error::invalid_instance("weights too large: worst-case score overflows u64"))?;

        Ok(Self {
            relations,
            item_count,
        })
    }

    /// Parses instance text: one `A B 2` relation per line.
    ///
    /// Fields may be separated by whitespace or commas. Items are letter labels
    /// or decimal indices. `#` starts a comment.
    ///
    /// # Errors
    /// Returns [`Error::Parse`] for malformed lines, or any error from [`Instance::new`].
    pub fn parse(text: &str) -> Result<Self> {
        let mut relations = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|f| !f.is_empty())
                .collect();
            let [a, b, w] = fields.as_slice() else {
                return Err(Error::parse(
                    line_no,
                    format!("expected 3 fields, found {}", fields.len()),
                ));
            };

            let a = parse_label(a).ok_or_else(|| Error::parse(line_no, format!("bad item '{a}'")))?;
            let b = parse_label(b).ok_or_else(|| Error::parse(line_no, format!("bad item '{b}'")))?;
            let weight = w
                .parse::<u64>()
                .map_err(|e| Error::parse(line_no, format!("bad weight '{w}': {e}")))?;
            relations.push(Relation::new(a, b, weight));
        }
        Self::new(relations)
    }

    /// Reads and parses an instance file.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read, or any parse/validation error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// The bundled 15-device, 25-relation rack.
    ///
    /// # Errors
    /// Only if the bundled data is corrupt.
    pub fn sample() -> Result<Self> {
        Self::parse(SAMPLE)
    }

    /// Number of items (positions).
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Relations in input order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Number of distinct orderings, `N!`, saturating at `u64::MAX`.
    pub fn permutation_count(&self) -> u64 {
        (2..=self.item_count as u64).fold(1u64, u64::saturating_mul)
    }

    /// Total weighted cable length of `candidate`.
    ///
    /// Pure and deterministic. `candidate` must cover exactly this instance's items.
    ///
    /// # Panics
    /// Panics if `candidate` is shorter than [`Instance::item_count`]; a relation
    /// would index past its positions.
    #[inline]
    pub fn score(&self, candidate: &Candidate) -> u64 {
        debug_assert_eq!(candidate.len(), self.item_count);
        let pos = candidate.positions();
        self.relations
            .iter()
            .map(|r| r.weight * pos[r.a].abs_diff(pos[r.b]) as u64)
            .sum()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Items {A,B,C,D}, relations (A,B,2), (B,C,1), (A,D,3).
    fn four_items() -> Instance {
        Instance::new(vec![
            Relation::new(0, 1, 2),
            Relation::new(1, 2, 1),
            Relation::new(0, 3, 3),
        ])
        .unwrap()
    }

    #[test]
    fn scores_literal_orders() {
        let inst = four_items();
        assert_eq!(inst.item_count(), 4);

        // [A, B, C, D]
        let abcd = Candidate::from_order(vec![0, 1, 2, 3]).unwrap();
        assert_eq!(inst.score(&abcd), 12);

        // [D, A, B, C]
        let dabc = Candidate::from_order(vec![3, 0, 1, 2]).unwrap();
        assert_eq!(inst.score(&dabc), 6);
    }

    #[test]
    fn scoring_is_idempotent() {
        let inst = Instance::sample().unwrap();
        let c = Candidate::from_order((0..15).rev().collect()).unwrap();
        assert_eq!(inst.score(&c), inst.score(&c));
    }

    #[test]
    fn sample_has_fifteen_devices() {
        let inst = Instance::sample().unwrap();
        assert_eq!(inst.item_count(), 15);
        assert_eq!(inst.relations().len(), 25);
        assert_eq!(inst.relations()[0], Relation::new(0, 1, 2));
        assert_eq!(inst.relations()[24], Relation::new(14, 9, 1));
    }

    #[test]
    fn parse_accepts_labels_indices_and_commas() {
        let inst = Instance::parse(
            "# rack\n\
             A B 2\n\
             \n\
             1, 2, 1   # trailing comment\n\
             A\tD\t3\n",
        )
        .unwrap();
        assert_eq!(inst, four_items());
    }

    #[test]
    fn item_count_is_max_index_plus_one() {
        let inst = Instance::parse("A F 1\n").unwrap();
        assert_eq!(inst.item_count(), 6);
    }

    #[test]
    fn parse_reports_line_numbers() {
        let err = Instance::parse("A B 2\nA C\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }), "{err}");

        let err = Instance::parse("A B x\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }), "{err}");

        let err = Instance::parse("A ? 1\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }), "{err}");

        let err = Instance::parse("A B -1\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }), "{err}");
    }

    #[test]
    fn rejects_malformed_instances() {
        assert!(matches!(Instance::parse("# nothing\n"), Err(Error::InvalidInstance(_))));
        assert!(matches!(Instance::parse("A A 1\n"), Err(Error::InvalidInstance(_))));
        assert!(matches!(
            Instance::parse("A B 1\nA B 2\n"),
            Err(Error::InvalidInstance(_))
        ));
        assert!(matches!(
            Instance::new(vec![Relation::new(0, MAX_ITEMS, 1)]),
            Err(Error::InvalidInstance(_))
        ));
    }

    #[test]
    fn reverse_pair_is_not_a_duplicate() {
        let inst = Instance::parse("A B 1\nB A 2\n").unwrap();
        assert_eq!(inst.relations().len(), 2);
    }

    #[test]
    fn rejects_weights_that_could_overflow() {
        let err = Instance::new(vec![
            Relation::new(0, 1, u64::MAX / 2),
            Relation::new(1, 2, 1),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInstance(_)));

        // Two items: span 1, one huge weight still fits.
        Instance::new(vec![Relation::new(0, 1, u64::MAX)]).unwrap();
    }

    #[test]
    fn labels_round_trip_through_parse() {
        assert_eq!(label(0), "A");
        assert_eq!(label(25), "Z");
        assert_eq!(label(26), "a");
        assert_eq!(label(51), "z");
        assert_eq!(label(52), "52");
        for i in [0, 7, 25, 26, 40, 51, 52, 1000] {
            assert_eq!(parse_label(&label(i)), Some(i));
        }
        assert_eq!(parse_label(""), None);
        assert_eq!(parse_label("AB"), None);
        assert_eq!(parse_label("-3"), None);
    }

    #[test]
    fn permutation_count_saturates() {
        assert_eq!(four_items().permutation_count(), 24);
        assert_eq!(Instance::sample().unwrap().permutation_count(), 1_307_674_368_000);
        let big = Instance::new(vec![Relation::new(0, 30, 1)]).unwrap();
        assert_eq!(big.permutation_count(), u64::MAX);
    }
}
