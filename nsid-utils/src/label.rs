//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! VLAN label algebra: parsing, canonicalization, intersection and
//! enumeration over a union of closed integer intervals.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A label: a type-URI paired with a canonical union of closed integer
/// intervals.
///
/// The value-set is always kept sorted by lower bound, with no two
/// intervals overlapping or touching (`[1,2]` and `[3,3]` are merged
/// into `[1,3]`).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub label_type: String,
    values: Vec<(u32, u32)>,
}

/// Raised when a label's value-set string can't be parsed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LabelParseError {
    pub input: String,
}

/// Raised when an intersection (or any other set operation) would
/// produce a label with an empty value-set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmptyLabelSet;

// ===== impl Label =====

impl Label {
    /// Parses a comma-separated list of singletons (`n`) and ranges
    /// (`a-b`, with `a <= b`) into a canonical label. Tokens may be
    /// given in any order and may overlap or duplicate; the result is
    /// always sorted, disjoint, and non-adjacent.
    pub fn new(
        label_type: impl Into<String>,
        values: &str,
    ) -> Result<Label, LabelParseError> {
        let mut intervals = Vec::new();
        for token in values.split(',') {
            let token = token.trim();
            intervals.push(parse_token(token, values)?);
        }
        Ok(Label {
            label_type: label_type.into(),
            values: canonicalize(intervals),
        })
    }

    /// Builds a label directly from an already-canonical interval list.
    /// Used internally by `intersect` and by callers that already hold
    /// normalized bounds (e.g. the pathfinder).
    pub(crate) fn from_intervals(
        label_type: impl Into<String>,
        values: Vec<(u32, u32)>,
    ) -> Label {
        Label {
            label_type: label_type.into(),
            values,
        }
    }

    /// The canonical interval list, sorted and disjoint.
    pub fn values(&self) -> &[(u32, u32)] {
        &self.values
    }

    /// Intersects two labels, returning a new canonical label. Fails
    /// with `EmptyLabelSet` if the result would contain no values.
    ///
    /// `intersect` ignores `label_type`: the pathfinder is responsible
    /// for only ever intersecting labels of the same type.
    pub fn intersect(&self, other: &Label) -> Result<Label, EmptyLabelSet> {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.values.len() && j < other.values.len() {
            let (a_lo, a_hi) = self.values[i];
            let (b_lo, b_hi) = other.values[j];
            let lo = a_lo.max(b_lo);
            let hi = a_hi.min(b_hi);
            if lo <= hi {
                result.push((lo, hi));
            }
            if a_hi < b_hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        if result.is_empty() {
            return Err(EmptyLabelSet);
        }
        Ok(Label::from_intervals(self.label_type.clone(), result))
    }

    /// Enumerates every integer value in the label's value-set, in
    /// ascending order.
    pub fn enumerate(&self) -> Vec<u32> {
        self.values
            .iter()
            .flat_map(|&(lo, hi)| lo..=hi)
            .collect()
    }

    /// True iff the value-set contains exactly one value.
    pub fn is_singleton(&self) -> bool {
        self.values.len() == 1 && self.values[0].0 == self.values[0].1
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|&(lo, hi)| {
                if lo == hi {
                    lo.to_string()
                } else {
                    format!("{lo}-{hi}")
                }
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

// ===== impl LabelParseError =====

impl LabelParseError {
    pub fn log(&self) {
        warn!(input = %self.input, "{}", self);
    }
}

impl fmt::Display for LabelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse label value-set '{}'", self.input)
    }
}

impl std::error::Error for LabelParseError {}

// ===== impl EmptyLabelSet =====

impl fmt::Display for EmptyLabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label intersection produced an empty value-set")
    }
}

impl std::error::Error for EmptyLabelSet {}

// ===== helper functions =====

fn parse_token(
    token: &str,
    original: &str,
) -> Result<(u32, u32), LabelParseError> {
    let err = || LabelParseError {
        input: original.to_owned(),
    };

    if let Some((lo, hi)) = token.split_once('-') {
        let lo: u32 = lo.trim().parse().map_err(|_| err())?;
        let hi: u32 = hi.trim().parse().map_err(|_| err())?;
        if lo > hi {
            return Err(err());
        }
        Ok((lo, hi))
    } else {
        let n: u32 = token.parse().map_err(|_| err())?;
        Ok((n, n))
    }
}

// Sorts by lower bound and folds left, merging whenever the next
// interval's lower bound doesn't leave a gap after the current upper
// bound (i.e. `next.lo <= current.hi + 1`).
fn canonicalize(mut intervals: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    intervals.sort_by_key(|&(lo, _)| lo);

    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(intervals.len());
    for (lo, hi) in intervals {
        match merged.last_mut() {
            Some((_, last_hi)) if lo <= last_hi.saturating_add(1) => {
                *last_hi = (*last_hi).max(hi);
            }
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes() {
        assert_eq!(Label::new("", "1,2").unwrap().values(), &[(1, 2)]);
        assert_eq!(Label::new("", "1,2,3").unwrap().values(), &[(1, 3)]);
        assert_eq!(Label::new("", "1-2,3").unwrap().values(), &[(1, 3)]);
        assert_eq!(Label::new("", "1-3,2").unwrap().values(), &[(1, 3)]);
        assert_eq!(Label::new("", "1-3,3,1-2").unwrap().values(), &[(1, 3)]);
        assert_eq!(
            Label::new("", "2-4,8,1-3").unwrap().values(),
            &[(1, 4), (8, 8)]
        );
    }

    #[test]
    fn enumerate_matches_spec_scenario() {
        let label = Label::new("", "2-4,8,1-3").unwrap();
        assert_eq!(label.enumerate(), vec![1, 2, 3, 4, 8]);
    }

    #[test]
    fn idempotent_under_reparse() {
        for s in ["1,2", "2-4,8,1-3", "1781-1789"] {
            let once = Label::new("", s).unwrap();
            let twice = Label::new("", &once.to_string()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn intersection_is_commutative_and_idempotent() {
        let a = Label::new("", "1,2,3").unwrap();
        let b = Label::new("", "2-4").unwrap();
        assert_eq!(a.intersect(&b), b.intersect(&a));
        assert_eq!(a.intersect(&a).unwrap(), a);
    }

    #[test]
    fn intersection_values() {
        let l12 = Label::new("", "1,2").unwrap();
        let l123 = Label::new("", "1,2,3").unwrap();
        let l234 = Label::new("", "2-4").unwrap();
        let l48 = Label::new("", "4-8").unwrap();

        assert_eq!(l12.intersect(&l12).unwrap().values(), &[(1, 2)]);
        assert_eq!(l12.intersect(&l123).unwrap().values(), &[(1, 2)]);
        assert_eq!(l12.intersect(&l234).unwrap().values(), &[(2, 2)]);
        assert_eq!(l123.intersect(&l234).unwrap().values(), &[(2, 3)]);
        assert_eq!(l234.intersect(&l48).unwrap().values(), &[(4, 4)]);
        assert_eq!(l12.intersect(&l48), Err(EmptyLabelSet));
    }

    #[test]
    fn intersection_of_disjoint_ranges_is_empty() {
        let a = Label::new("", "1781-1784").unwrap();
        let b = Label::new("", "1780-1780").unwrap();
        assert_eq!(a.intersect(&b), Err(EmptyLabelSet));
    }

    #[test]
    fn contained_range_intersection() {
        let a = Label::new("", "80-89").unwrap();
        let b = Label::new("", "81-82").unwrap();
        assert_eq!(a.intersect(&b).unwrap().enumerate(), vec![81, 82]);
    }

    #[test]
    fn singleton_predicate() {
        assert!(Label::new("", "5").unwrap().is_singleton());
        assert!(!Label::new("", "5-6").unwrap().is_singleton());
        assert!(!Label::new("", "5,7").unwrap().is_singleton());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(Label::new("", "3-1").is_err());
        assert!(Label::new("", "abc").is_err());
        assert!(Label::new("", "1-2-3").is_err());
    }
}
