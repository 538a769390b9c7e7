//! The redundancy oracle and single-piece hulls.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::basic::Flags;
use crate::tab::{solve_lp, update_from_tab, LpResult, Tab};
use crate::{BasicMap, BasicSet, Result};

impl BasicSet {
    /// Whether the inequality `c` is implied by this basic set, which
    /// must not contain `c` itself: the minimum of `c` over the set is
    /// non-negative.
    ///
    /// If the LP discovers the set to be empty, the returned basic set is
    /// the flagged-empty form; the caller keeps whichever comes back.
    ///
    /// The cheap rejection first: if `c` bounds a direction in which no
    /// inequality of the set points the same way, the set cannot imply
    /// `c` and no LP is needed.
    pub fn constraint_is_redundant(self, c: &[BigInt]) -> Result<(Self, bool)> {
        let total = self.total();
        for i in 0..total {
            if c[1 + i].is_zero() {
                continue;
            }
            let positive = c[1 + i].is_positive();
            let covered = self
                .ineq
                .iter()
                .any(|row| !row[1 + i].is_zero() && row[1 + i].is_positive() == positive);
            if !covered {
                return Ok((self, false));
            }
        }

        match solve_lp(&self, false, c, &BigInt::one())? {
            LpResult::Unbounded => Ok((self, false)),
            LpResult::Empty => Ok((self.set_to_empty(), false)),
            LpResult::Optimal { num, .. } => {
                let redundant = !num.is_negative();
                Ok((self, redundant))
            }
        }
    }

    /// The convex hull of one basic set: the same solution set with the
    /// redundant constraints removed and implicit equalities made
    /// explicit.
    pub fn convex_hull(self) -> Result<Self> {
        let mut bset = self.gauss();
        if bset.is_empty_flagged()
            || bset.flags.has(Flags::NO_REDUNDANT)
            || bset.n_ineq() <= 1
        {
            return Ok(bset);
        }
        let mut tab = Tab::from_basic_set(&bset);
        tab.detect_implicit_equalities()?;
        tab.detect_redundant()?;
        bset = update_from_tab(bset, &tab);
        bset.flags.set(Flags::NO_IMPLICIT | Flags::NO_REDUNDANT);
        Ok(bset)
    }
}

impl BasicMap {
    /// See [`BasicSet::convex_hull`].
    pub fn convex_hull(self) -> Result<Self> {
        Ok(BasicMap::from_basic_set(self.base.convex_hull()?))
    }
}

#[cfg(test)]
mod tests {
    use crate::{BasicSet, Space};

    #[test]
    fn basic_hull_drops_the_looser_bound() {
        // x >= 0, x <= 10, x >= 2: the first is redundant.
        let b = BasicSet::from_rows(
            Space::set_space(0, 1),
            &[],
            &[&[0, 1], &[10, -1], &[-2, 1]],
        )
        .unwrap();
        let hull = b.convex_hull().unwrap();
        assert_eq!(hull.n_ineq(), 2);
        let expect =
            BasicSet::from_rows(Space::set_space(0, 1), &[], &[&[-2, 1], &[10, -1]]).unwrap();
        assert!(hull.is_equal(&expect).unwrap());
    }

    #[test]
    fn redundancy_oracle_fast_path() {
        use palisade_core::seq;
        // B = {x >= 0}; c = x <= 5 bounds a direction B does not.
        let b = BasicSet::from_rows(Space::set_space(0, 1), &[], &[&[0, 1]]).unwrap();
        let c = crate::basic::row_from_i64(&[5, -1]);
        let (b, redundant) = b.constraint_is_redundant(&c).unwrap();
        assert!(!redundant);

        // c = x >= -1 is implied by x >= 0.
        let c = crate::basic::row_from_i64(&[1, 1]);
        let (b, redundant) = b.constraint_is_redundant(&c).unwrap();
        assert!(redundant);

        // c = x >= 1 is not.
        let mut c = crate::basic::row_from_i64(&[-1, 1]);
        seq::normalize(&mut c);
        let (_, redundant) = b.constraint_is_redundant(&c).unwrap();
        assert!(!redundant);
    }

    #[test]
    fn basic_hull_is_idempotent() {
        let b = BasicSet::from_rows(
            Space::set_space(0, 2),
            &[],
            &[&[0, 1, 0], &[4, -1, 0], &[0, 0, 1], &[4, 0, -1], &[9, -1, -1]],
        )
        .unwrap();
        let once = b.convex_hull().unwrap();
        let twice = once.clone().convex_hull().unwrap();
        assert_eq!(once.n_eq(), twice.n_eq());
        assert_eq!(once.n_ineq(), twice.n_ineq());
        assert!(once.is_equal(&twice).unwrap());
    }
}
