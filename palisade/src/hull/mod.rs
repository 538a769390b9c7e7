//! The convex hull engine.
//!
//! The dispatcher normalizes the input union, factors out its affine
//! hull so the kernels only ever see full-dimensional sets, and then
//! chooses between the ridge-wrapping kernel (bounded sets) and the
//! Minkowski-sum Fourier-Motzkin kernel (unbounded sets), with special
//! cases for zero- and one-dimensional sets and single-piece unions.

mod elim;
mod reduce;
mod simple;
mod wrap;

use tracing::debug;

use crate::basic::Flags;
use crate::map::overlying_set;
use crate::{BasicMap, BasicSet, Error, Map, Result, Set};

/// A zero-dimensional set is empty or a single point.
fn convex_hull_0d(set: Set) -> BasicSet {
    let space = *set.space();
    let set = set.normalize();
    if set.n() == 0 {
        BasicSet::empty(space)
    } else {
        BasicSet::universe(space)
    }
}

/// Hull of a pure set (no parameters, no divisions) whose affine hull is
/// full-dimensional; the set may be unbounded.
fn uset_convex_hull(set: Set) -> Result<BasicSet> {
    debug_assert_eq!(set.space().n_param, 0, "parameters inside the pure hull");
    if set.space().n_dim() == 0 {
        return Ok(convex_hull_0d(set));
    }
    let space = *set.space();
    let set = set.set_rational().normalize();
    if set.n() == 0 {
        return Ok(BasicSet::empty(space));
    }
    if set.n() == 1 {
        return Ok(set.into_parts().pop().expect("one part"));
    }
    if set.space().n_dim() == 1 {
        return elim::convex_hull_1d(set);
    }
    if !set.is_bounded()? {
        debug!(parts = set.n(), dim = space.n_dim(), "unbounded union, using elimination");
        return elim::uset_convex_hull_elim(set);
    }
    debug!(parts = set.n(), dim = space.n_dim(), "bounded union, using wrapping");
    wrap::uset_convex_hull_wrap(set)
}

/// The recursion anchor of the wrapping kernel: like [`uset_convex_hull`]
/// but with boundedness already established by the caller.  The dimension
/// strictly decreases through `compute_facet`, so the recursion is
/// well-founded.
pub(crate) fn uset_convex_hull_wrap_bounded(set: Set) -> Result<BasicSet> {
    let space = *set.space();
    if space.n_dim() == 0 {
        return Ok(BasicSet::universe(space).set_rational());
    }
    let set = set.set_rational().normalize();
    if set.n() == 0 {
        return Ok(BasicSet::empty(space));
    }
    if set.n() == 1 {
        return Ok(set.into_parts().pop().expect("one part"));
    }
    if set.space().n_dim() == 1 {
        return elim::convex_hull_1d(set);
    }
    wrap::uset_convex_hull_wrap(set)
}

/// Hull a lower-dimensional set by flattening its affine hull away:
/// transform, hull the full-dimensional image, transform back and
/// re-impose the affine hull.
fn modulo_affine_hull(set: Set, affine_hull: BasicSet) -> Result<BasicSet> {
    let (t, t2) = affine_hull.remove_equalities()?;
    let set = set.preimage(&t)?;
    let hull = uset_convex_hull(set)?;
    let hull = hull.preimage(&t2)?;
    hull.intersect(affine_hull)
}

impl Map {
    /// The exact convex hull of the union, as a single basic map.
    pub fn convex_hull(self) -> Result<BasicMap> {
        if self.n() == 0 {
            return Ok(BasicMap::empty(*self.space()));
        }
        let map = self.align_divs()?;
        let model = BasicMap::from_basic_set(map.parts()[0].clone());
        let set = map.underlying_set()?;

        let affine_hull = set.clone().affine_hull()?;
        if affine_hull.is_empty_flagged() {
            let mut out = overlying_set(affine_hull, &model)?;
            out.base.flags.clear(Flags::RATIONAL);
            return Ok(out);
        }
        let bset = if affine_hull.n_eq() > 0 {
            debug!(equalities = affine_hull.n_eq(), "factoring out the affine hull");
            modulo_affine_hull(set, affine_hull)?
        } else {
            uset_convex_hull(set)?
        };

        let mut out = overlying_set(bset, &model)?;
        out.base.flags.clear(Flags::RATIONAL);
        Ok(out)
    }
}

impl Set {
    /// The exact convex hull of the union, as a single basic set.
    pub fn convex_hull(self) -> Result<BasicSet> {
        Map::from_set(self).convex_hull()?.into_basic_set()
    }

    /// A superset of the convex hull described only by (relaxed)
    /// translates of the input's own constraints.
    pub fn simple_hull(self) -> Result<BasicSet> {
        Map::from_set(self).simple_hull()?.into_basic_set()
    }
}

impl Map {
    /// A superset of the convex hull described only by (relaxed)
    /// translates of the input's own constraints.
    pub fn simple_hull(self) -> Result<BasicMap> {
        if self.n() == 0 {
            return Ok(BasicMap::empty(*self.space()));
        }
        if self.n() == 1 {
            return Ok(BasicMap::from_basic_set(
                self.parts()[0].clone(),
            ));
        }
        let map = self.align_divs()?;
        let model = BasicMap::from_basic_set(map.parts()[0].clone());
        let set = map.underlying_set()?;
        let bset = simple::uset_simple_hull(set)?;
        overlying_set(bset, &model)
    }
}

/// Shared error for kernels handed a state they cannot occur in when the
/// caller's preconditions hold.
pub(crate) fn invariant(msg: &'static str) -> Error {
    Error::Invariant(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Space;

    fn square(x0: i64, y0: i64, side: i64) -> BasicSet {
        BasicSet::from_rows(
            Space::set_space(0, 2),
            &[],
            &[
                &[-x0, 1, 0],
                &[x0 + side, -1, 0],
                &[-y0, 0, 1],
                &[y0 + side, 0, -1],
            ],
        )
        .unwrap()
    }

    #[test]
    fn wrapping_and_elimination_agree_on_bounded_unions() {
        let build = || {
            Set::from_basic_set(square(0, 0, 1))
                .add_basic_set(square(2, 2, 1))
                .unwrap()
                .set_rational()
                .normalize()
        };
        let wrapped = wrap::uset_convex_hull_wrap(build()).unwrap();
        let eliminated = elim::uset_convex_hull_elim(build()).unwrap();
        assert!(wrapped.is_equal(&eliminated).unwrap());
    }

    #[test]
    fn lower_dimensional_unions_lift_through_the_affine_hull() {
        // Two points on the diagonal: the hull is a segment of x = y.
        let point = |v: i64| {
            BasicSet::from_rows(Space::set_space(0, 2), &[&[-v, 1, 0], &[-v, 0, 1]], &[]).unwrap()
        };
        let set = Set::from_basic_set(point(0)).add_basic_set(point(2)).unwrap();
        let hull = set.convex_hull().unwrap();
        let expect = BasicSet::from_rows(
            Space::set_space(0, 2),
            &[&[0, 1, -1]],
            &[&[0, 1, 0], &[2, -1, 0]],
        )
        .unwrap();
        assert!(hull.is_equal(&expect).unwrap());
    }

    #[test]
    fn zero_dimensional_hull_is_empty_or_universe() {
        let space = Space::set_space(0, 0);
        assert!(Set::empty(space).convex_hull().unwrap().is_empty_flagged());
        let set = Set::from_basic_set(BasicSet::universe(space));
        assert!(set.convex_hull().unwrap().is_universe());
    }
}
