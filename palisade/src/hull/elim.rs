//! Low-dimensional and Fourier-Motzkin hull kernels.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use palisade_core::seq;

use crate::hull::invariant;
use crate::{BasicSet, Constraint, Result, Set, Space};

/// The tightest lower and upper bound rows of a single one-dimensional
/// piece.  A simplified piece carries at most one equality, which pins
/// both sides at once.
fn part_bounds_1d(part: &BasicSet) -> Result<(Option<Constraint>, Option<Constraint>)> {
    if part.n_eq() > 0 {
        if part.n_eq() != 1 {
            return Err(invariant("several equalities on a line"));
        }
        let eq = &part.eqs()[0];
        let mut neg = eq.clone();
        seq::neg(&mut neg);
        return Ok(if eq[1].is_positive() {
            (Some(eq.clone()), Some(neg))
        } else {
            (Some(neg), Some(eq.clone()))
        });
    }

    let mut lower: Option<Constraint> = None;
    let mut upper: Option<Constraint> = None;
    for row in part.ineqs() {
        if row[1].is_positive() {
            let tighter = match &lower {
                None => true,
                // -l0/l1 < -r0/r1, by cross-multiplication.
                Some(l) => &l[0] * &row[1] > &l[1] * &row[0],
            };
            if tighter {
                lower = Some(row.clone());
            }
        } else if row[1].is_negative() {
            let tighter = match &upper {
                None => true,
                Some(u) => &u[0] * &row[1] < &u[1] * &row[0],
            };
            if tighter {
                upper = Some(row.clone());
            }
        }
    }
    Ok((lower, upper))
}

/// Convex hull of a one-dimensional pure set: take each part's tightest
/// lower and upper bound and relax both across the parts, comparing the
/// bound points by cross-multiplication.  A side missing from any part
/// is missing from the hull.
pub(crate) fn convex_hull_1d(set: Set) -> Result<BasicSet> {
    let space = *set.space();
    debug_assert_eq!(space.n_dim(), 1, "one-dimensional kernel misapplied");
    let set = set.normalize();
    if set.n() == 0 {
        return Ok(BasicSet::empty(space));
    }

    let mut lower: Option<Constraint> = None;
    let mut upper: Option<Constraint> = None;
    for (i, part) in set.parts().iter().enumerate() {
        let (p_lower, p_upper) = part_bounds_1d(part)?;

        lower = match (lower, p_lower) {
            (Some(l), Some(pl)) if i > 0 => {
                // Keep the lower of the two bound points.
                if &l[0] * &pl[1] < &l[1] * &pl[0] {
                    Some(pl)
                } else {
                    Some(l)
                }
            }
            (_, pl) if i == 0 => pl,
            _ => None,
        };
        upper = match (upper, p_upper) {
            (Some(u), Some(pu)) if i > 0 => {
                if &u[0] * &pu[1] > &u[1] * &pu[0] {
                    Some(pu)
                } else {
                    Some(u)
                }
            }
            (_, pu) if i == 0 => pu,
            _ => None,
        };
        if lower.is_none() && upper.is_none() {
            break;
        }
    }

    let mut hull = BasicSet::universe(space).set_rational();
    if let Some(l) = lower {
        hull = hull.add_inequality(l)?;
    }
    if let Some(u) = upper {
        hull = hull.add_inequality(u)?;
    }
    Ok(hull.finalize())
}

/// Convex hull of two pure basic sets by Minkowski sum in homogeneous
/// coordinates: build
///
/// ```text
///     x = y + z,   y in hom(B1),   z in hom(B2),   y0 >= 0,  z0 >= 0
/// ```
///
/// over `2 + 3d` variables (the homogeneous `x` reuses the constant
/// column) and project `y` and `z` away again.
pub(crate) fn convex_hull_pair(bset1: BasicSet, bset2: BasicSet) -> Result<BasicSet> {
    let dim = bset1.space().n_dim();
    if bset2.space().n_dim() != dim {
        return Err(invariant("pair hull on mismatched dimensions"));
    }
    let block = 1 + dim;
    let width = 3 * block;
    let mut hull = BasicSet::universe(Space::underlying(2 + 3 * dim));

    for (i, bset) in [&bset1, &bset2].into_iter().enumerate() {
        let off = (i + 1) * block;
        for eq in bset.eqs() {
            let mut row = vec![BigInt::zero(); width];
            row[off..off + block].clone_from_slice(eq);
            hull = hull.add_equality(row)?;
        }
        for ineq in bset.ineqs() {
            let mut row = vec![BigInt::zero(); width];
            row[off..off + block].clone_from_slice(ineq);
            hull = hull.add_inequality(row)?;
        }
        let mut nonneg = vec![BigInt::zero(); width];
        nonneg[off] = BigInt::from(1);
        hull = hull.add_inequality(nonneg)?;
    }
    for j in 0..block {
        let mut row = vec![BigInt::zero(); width];
        row[j] = BigInt::from(-1);
        row[block + j] = BigInt::from(1);
        row[2 * block + j] = BigInt::from(1);
        hull = hull.add_equality(row)?;
    }

    let hull = hull.set_rational();
    let hull = hull.remove_dims(dim, 2 * block)?;
    hull.convex_hull()
}

/// Fold the binary Minkowski-sum hull across the union.
pub(crate) fn uset_convex_hull_elim(set: Set) -> Result<BasicSet> {
    let space = *set.space();
    let mut parts = set.into_parts().into_iter();
    let Some(mut hull) = parts.next() else {
        return Ok(BasicSet::empty(space));
    };
    for part in parts {
        hull = convex_hull_pair(hull, part)?;
    }
    Ok(hull)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Space;

    fn interval(lo: i64, hi: i64) -> BasicSet {
        BasicSet::from_rows(Space::set_space(0, 1), &[], &[&[-lo, 1], &[hi, -1]]).unwrap()
    }

    #[test]
    fn one_dimensional_hull_of_overlapping_intervals() {
        let set = Set::from_basic_set(interval(0, 5))
            .add_basic_set(interval(3, 10))
            .unwrap();
        let hull = convex_hull_1d(set).unwrap();
        assert!(hull.is_equal(&interval(0, 10)).unwrap());
    }

    #[test]
    fn one_dimensional_hull_of_opposite_rays_is_universe() {
        let right = BasicSet::from_rows(Space::set_space(0, 1), &[], &[&[0, 1]]).unwrap();
        let left = BasicSet::from_rows(Space::set_space(0, 1), &[], &[&[0, -1]]).unwrap();
        let set = Set::from_basic_set(right).add_basic_set(left).unwrap();
        let hull = convex_hull_1d(set).unwrap();
        assert!(hull.is_universe());
    }

    #[test]
    fn one_dimensional_hull_of_points() {
        let point = |v: i64| {
            BasicSet::from_rows(Space::set_space(0, 1), &[&[-v, 1]], &[]).unwrap()
        };
        let set = Set::from_basic_set(point(2)).add_basic_set(point(7)).unwrap();
        let hull = convex_hull_1d(set).unwrap();
        assert!(hull.is_equal(&interval(2, 7)).unwrap());
    }

    #[test]
    fn pair_hull_of_two_boxes() {
        let square = |x: i64, y: i64| {
            BasicSet::from_rows(
                Space::set_space(0, 2),
                &[],
                &[
                    &[-x, 1, 0],
                    &[x + 1, -1, 0],
                    &[-y, 0, 1],
                    &[y + 1, 0, -1],
                ],
            )
            .unwrap()
        };
        // Hull of [0,1]^2 and [2,3]^2 contains the joining diagonal.
        let hull = convex_hull_pair(square(0, 0), square(2, 2)).unwrap();
        assert!(!hull.is_empty_flagged());
        let inside = BasicSet::from_rows(
            Space::set_space(0, 2),
            &[&[-1, 1, 0], &[-1, 0, 1]],
            &[],
        )
        .unwrap();
        assert!(inside.is_subset(&hull).unwrap());
        // Far corners stay out.
        let outside = BasicSet::from_rows(
            Space::set_space(0, 2),
            &[&[0, 1, 0], &[-3, 0, 1]],
            &[],
        )
        .unwrap();
        assert!(!outside.is_subset(&hull).unwrap());
    }
}
