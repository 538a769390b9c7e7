//! Affine hulls and equality removal.
//!
//! The affine hull of a basic set is found by promoting implicit
//! equalities through the LP layer; the affine hull of a union is the
//! affine span of its parts, computed by intersecting the parts' equality
//! row spaces exactly.  `remove_equalities` turns a system of equalities
//! into a pair of homogeneous transforms that flatten the variety to a
//! full-dimensional space and back.

use num_traits::Zero;
use palisade_core::{mat::Mat, seq};

use crate::tab::{update_from_tab, Tab};
use crate::{BasicSet, Error, Result, Set};

impl BasicSet {
    /// The smallest affine subspace containing this piece, described by
    /// equalities only.
    pub fn affine_hull(self) -> Result<BasicSet> {
        let bset = self.simplify();
        if bset.is_empty_flagged() {
            return Ok(bset);
        }
        let mut tab = Tab::from_basic_set(&bset);
        tab.detect_implicit_equalities()?;
        let mut hull = update_from_tab(bset, &tab);
        hull.ineq.clear();
        hull.clear_derived_flags();
        Ok(hull.gauss())
    }

    /// Homogeneous transforms `(T, T2)` with `x = T z` parameterizing the
    /// variety of this piece's equalities and `z = T2 x` flattening it
    /// back; the equality coordinates are dropped on both sides.
    pub fn remove_equalities(&self) -> Result<(Mat, Mat)> {
        let bset = self.clone().gauss();
        if bset.is_empty_flagged() {
            return Err(Error::Invariant("removing equalities of an empty piece"));
        }
        let d = bset.total();
        let k = bset.n_eq();
        let mut m = Mat::zero(1 + k, 1 + d);
        m.set(0, 0, 1.into());
        for (i, eq) in bset.eqs().iter().enumerate() {
            m.row_mut(1 + i).clone_from_slice(eq);
        }
        let u = m.right_inverse().ok_or(Error::SingularMatrix)?;
        let q = u.right_inverse().ok_or(Error::SingularMatrix)?;
        let t = u.drop_cols(1, k);
        let t2 = q.drop_rows(1, k);
        Ok((t, t2))
    }
}

impl Set {
    /// The affine span of the union: an equality holds on the union
    /// exactly when it lies in every part's equality row space.
    pub fn affine_hull(self) -> Result<BasicSet> {
        let space = *self.space();
        let set = self.normalize();
        let mut parts = set.into_parts().into_iter();
        let Some(first) = parts.next() else {
            return Ok(BasicSet::empty(space));
        };
        let mut hull = first.affine_hull()?;
        for part in parts {
            if !hull.is_empty_flagged() && hull.n_eq() == 0 {
                break;
            }
            let other = part.affine_hull()?;
            if other.is_empty_flagged() {
                continue;
            }
            if hull.is_empty_flagged() {
                hull = other;
                continue;
            }
            hull = affine_span_union(hull, other)?;
        }
        hull.clear_derived_flags();
        Ok(hull)
    }
}

/// The affine span of two affine subspaces given by equality systems:
/// the intersection of their row spaces, via an integer kernel.
fn affine_span_union(a: BasicSet, b: BasicSet) -> Result<BasicSet> {
    if a.total() != b.total() {
        return Err(Error::SpaceMismatch);
    }
    let (k1, k2) = (a.n_eq(), b.n_eq());
    if k1 == 0 {
        return Ok(a);
    }
    if k2 == 0 {
        let mut out = a;
        out.eq.clear();
        return Ok(out);
    }
    let n = 1 + a.total();
    let mut m = Mat::zero(n, k1 + k2);
    for (j, eq) in a.eqs().iter().enumerate() {
        for (row, v) in eq.iter().enumerate() {
            if !v.is_zero() {
                m.set(row, j, v.clone());
            }
        }
    }
    for (j, eq) in b.eqs().iter().enumerate() {
        for (row, v) in eq.iter().enumerate() {
            if !v.is_zero() {
                m.set(row, k1 + j, -v.clone());
            }
        }
    }
    let kernel = m.kernel();

    let mut out = a.clone();
    out.eq.clear();
    for i in 0..kernel.n_row() {
        let w = kernel.row(i);
        let mut c = vec![num_bigint::BigInt::zero(); n];
        for (j, eq) in a.eqs().iter().enumerate() {
            if w[j].is_zero() {
                continue;
            }
            for (col, v) in eq.iter().enumerate() {
                if !v.is_zero() {
                    let t = std::mem::take(&mut c[col]);
                    c[col] = t + &w[j] * v;
                }
            }
        }
        if seq::first_non_zero(&c).is_none() {
            continue;
        }
        seq::normalize(&mut c);
        out.eq.push(c);
    }
    Ok(out.gauss())
}

#[cfg(test)]
mod tests {
    use crate::{BasicSet, Set, Space};
    use num_traits::Zero;

    #[test]
    fn implicit_equalities_become_the_hull() {
        // 0 <= x <= 0, 0 <= y <= 2: the hull is x = 0.
        let b = BasicSet::from_rows(
            Space::set_space(0, 2),
            &[],
            &[&[0, 1, 0], &[0, -1, 0], &[0, 0, 1], &[2, 0, -1]],
        )
        .unwrap();
        let hull = b.affine_hull().unwrap();
        assert_eq!(hull.n_eq(), 1);
        assert_eq!(hull.n_ineq(), 0);
        assert!(hull.eqs()[0][2].is_zero());
    }

    #[test]
    fn union_span_needs_a_common_equality() {
        // {(0,0)} u {(1,1)}: the individual equalities x=0, y=0 do not
        // survive, but x - y = 0 does.
        let p = |x: i64, y: i64| {
            BasicSet::from_rows(Space::set_space(0, 2), &[&[-x, 1, 0], &[-y, 0, 1]], &[]).unwrap()
        };
        let set = Set::from_basic_set(p(0, 0)).add_basic_set(p(1, 1)).unwrap();
        let hull = set.affine_hull().unwrap();
        assert_eq!(hull.n_eq(), 1);
        let eq = &hull.eqs()[0];
        // x - y = 0 up to sign and scale.
        assert!(eq[0].is_zero());
        assert_eq!(eq[1], -&eq[2]);
    }

    #[test]
    fn full_dimensional_union_has_no_equalities() {
        let seg = |x: i64| {
            BasicSet::from_rows(
                Space::set_space(0, 2),
                &[&[-x, 1, 0]],
                &[&[0, 0, 1], &[1, 0, -1]],
            )
            .unwrap()
        };
        let set = Set::from_basic_set(seg(0)).add_basic_set(seg(1)).unwrap();
        let hull = set.affine_hull().unwrap();
        assert_eq!(hull.n_eq(), 0);
    }

    #[test]
    fn remove_equalities_round_trips() {
        use num_bigint::BigInt;
        // x + y = 2 in 2-D: T maps a 1-D parameter onto the line.
        let b = BasicSet::from_rows(Space::set_space(0, 2), &[&[-2, 1, 1]], &[]).unwrap();
        let (t, t2) = b.remove_equalities().unwrap();
        assert_eq!(t.n_row(), 3);
        assert_eq!(t.n_col(), 2);
        assert_eq!(t2.n_row(), 2);
        assert_eq!(t2.n_col(), 3);
        // Every generated point satisfies the equality.
        for z in [0i64, 1, -3] {
            let zvec = [BigInt::from(1), BigInt::from(z)];
            let x: Vec<BigInt> = (0..3)
                .map(|r| &zvec[0] * t.at(r, 0) + &zvec[1] * t.at(r, 1))
                .collect();
            // -2*x0 + x1 + x2 = 0 in homogeneous coordinates.
            let v = BigInt::from(-2) * &x[0] + &x[1] + &x[2];
            assert!(v.is_zero(), "generated point off the variety");
        }
    }
}
