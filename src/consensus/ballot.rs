use std::fmt;

use serde::{Deserialize, Serialize};

/*
    A ballot names one proposal attempt. Every node carries the highest ballot
    it has promised (maxBallot) and refuses anything that compares lower.

    The comparison is deliberately NOT a lexicographic (depth, n, id) order:
    a ballot for a shallower depth is always lower, but when the depth is equal
    or deeper the counter n alone decides, with the proposer id as tie-break.
    Two ballots can therefore each be "lower" than the other. This is why
    Ballot does not implement PartialOrd.
*/

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Ballot {
    pub n: i64,
    pub proposer_id: String,
    pub depth: i64,
}

impl Ballot {
    pub fn new(n: i64, proposer_id: impl Into<String>, depth: i64) -> Self {
        Ballot {
            n,
            proposer_id: proposer_id.into(),
            depth,
        }
    }

    /// The ballot every node starts with; any real ballot compares above it.
    pub fn initial() -> Self {
        Ballot::new(-1, "-1", -1)
    }

    /// `self < other` under the protocol comparator.
    pub fn is_lower_than(&self, other: &Ballot) -> bool {
        if self.depth < other.depth {
            return true;
        }
        if self.n < other.n {
            return true;
        }
        self.n == other.n && self.proposer_id < other.proposer_id
    }

    /// `self > other`, derived as "not lower and not equal".
    pub fn is_higher_than(&self, other: &Ballot) -> bool {
        !self.is_lower_than(other) && self != other
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{},{}>", self.n, self.proposer_id, self.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_depth_orders_by_counter_then_proposer() {
        let a = Ballot::new(0, "A", 0);
        let b = Ballot::new(1, "B", 0);
        let c = Ballot::new(1, "C", 0);

        assert!(a.is_lower_than(&b));
        assert!(!b.is_lower_than(&a));
        assert!(b.is_lower_than(&c));
        assert!(!c.is_lower_than(&b));
        assert!(c.is_higher_than(&a));
    }

    #[test]
    fn test_shallower_depth_is_always_lower() {
        let shallow = Ballot::new(9, "Z", 0);
        let deep = Ballot::new(0, "A", 1);

        assert!(shallow.is_lower_than(&deep));
    }

    #[test]
    fn test_deeper_ballot_with_smaller_counter_is_also_lower() {
        let shallow = Ballot::new(9, "Z", 0);
        let deep = Ballot::new(0, "A", 1);

        // Both directions hold under the comparator.
        assert!(deep.is_lower_than(&shallow));
        assert!(shallow.is_lower_than(&deep));
        assert!(!deep.is_higher_than(&shallow));
    }

    #[test]
    fn test_equality_requires_every_field() {
        let a = Ballot::new(2, "A", 3);

        assert_eq!(a, Ballot::new(2, "A", 3));
        assert_ne!(a, Ballot::new(2, "A", 4));
        assert!(!a.is_lower_than(&a.clone()));
        assert!(!a.is_higher_than(&a.clone()));
    }

    #[test]
    fn test_initial_ballot_is_below_first_round() {
        let first = Ballot::new(0, "1", 0);

        assert!(!first.is_lower_than(&Ballot::initial()));
        assert!(Ballot::initial().is_lower_than(&first));
    }
}
