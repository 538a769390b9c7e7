//! The ridge-wrapping kernel: exact hulls of bounded, full-dimensional
//! unions by facet enumeration.
//!
//! An initial facet is built from a maximal set of linearly independent
//! bounding directions; every further facet is obtained by rotating a
//! known facet about one of its ridges until it supports the union
//! again.  The rotation itself is a single LP over the Minkowski
//! decomposition of the hull cone.

use ahash::AHashMap;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use palisade_core::{mat::Mat, seq};
use tracing::trace;

use crate::hull::{invariant, uset_convex_hull_wrap_bounded};
use crate::tab::{solve_lp, LpResult};
use crate::{BasicSet, Constraint, Result, Set, Space};

/// Test whether the union is bounded in the direction of `c` and, if it
/// is, lower `c`'s constant so the row becomes a supporting hyperplane.
///
/// The constant is updated incrementally: after each part, `c` supports
/// everything seen so far, so later minima only ever weaken it.  A part
/// discovered to be empty is promoted to the flagged-empty form.
fn uset_is_bound(set: &mut Set, c: &mut Constraint) -> Result<bool> {
    let one = BigInt::one();
    let mut first = true;
    for j in 0..set.n() {
        if set.parts[j].is_empty_flagged() {
            continue;
        }
        match solve_lp(&set.parts[j], false, c, &one)? {
            LpResult::Unbounded => return Ok(false),
            LpResult::Empty => {
                let space = *set.space();
                let part = std::mem::replace(
                    &mut set.parts[j],
                    BasicSet::empty(space),
                );
                set.parts[j] = part.set_to_empty();
            }
            LpResult::Optimal { num, den } => {
                if !den.is_one() {
                    seq::scale(c, &den);
                }
                if first || num.is_negative() {
                    c[0] -= &num;
                }
                first = false;
            }
        }
    }
    Ok(true)
}

/// If `c`'s direction is independent of the directions collected in
/// `dirs` and bounds the union, insert the corresponding supporting
/// hyperplane into `dirs` (kept ordered by leading coefficient position)
/// and report success.
fn is_independent_bound(
    set: &mut Set,
    c: &Constraint,
    dirs: &mut Vec<Constraint>,
) -> Result<bool> {
    let len = c.len();
    let mut row = vec![BigInt::zero(); len];
    row[1..].clone_from_slice(&c[1..]);

    let mut at = 0;
    if !dirs.is_empty() {
        let Some(mut pos) = seq::first_non_zero(&row[1..]) else {
            return Ok(false);
        };
        while at < dirs.len() {
            let pos_i = seq::first_non_zero(&dirs[at][1..]).expect("directions are non-zero");
            if pos_i < pos {
                at += 1;
                continue;
            }
            if pos_i > pos {
                break;
            }
            seq::elim(&mut row, &dirs[at], 1 + pos);
            match seq::first_non_zero(&row[1..]) {
                Some(p) => pos = p,
                None => return Ok(false),
            }
            at += 1;
        }
    }

    if !uset_is_bound(set, &mut row)? {
        return Ok(false);
    }
    dirs.insert(at, row);
    Ok(true)
}

/// A maximal set of linearly independent bounding hyperplanes of the
/// union, drawn from the constraints of its parts.
fn independent_bounds(set: &mut Set) -> Result<Vec<Constraint>> {
    let dim = set.space().n_dim();
    let mut dirs: Vec<Constraint> = Vec::with_capacity(dim);

    for i in 0..set.n() {
        if dirs.len() == dim {
            break;
        }
        let mut rows: Vec<Constraint> = set.parts[i].eqs().to_vec();
        rows.extend(set.parts[i].ineqs().iter().cloned());
        for cand in rows {
            if dirs.len() == dim {
                break;
            }
            is_independent_bound(set, &cand, &mut dirs)?;
        }
    }
    Ok(dirs)
}

/// The LP whose optimum wraps `facet` about `ridge`: for each part `k` a
/// block `(a_k, x_k)` with the part's homogenized constraints and
/// `a_k >= 0`, tied together by `sum_k x_{k,1} = 1`.
fn wrap_constraints(set: &Set) -> Result<BasicSet> {
    let block = 1 + set.space().n_dim();
    let n = set.n();
    let width = 1 + block * n;
    let mut lp = BasicSet::universe(Space::underlying(block * n));

    let mut tie = vec![BigInt::zero(); width];
    tie[0] = BigInt::from(-1);
    for i in 0..n {
        tie[1 + block * i + 1] = BigInt::one();
    }
    lp = lp.add_equality(tie)?;

    for (i, part) in set.parts().iter().enumerate() {
        let off = 1 + block * i;
        let mut dilation = vec![BigInt::zero(); width];
        dilation[off] = BigInt::one();
        lp = lp.add_inequality(dilation)?;

        for eq in part.eqs() {
            let mut row = vec![BigInt::zero(); width];
            row[off..off + block].clone_from_slice(eq);
            lp = lp.add_equality(row)?;
        }
        for ineq in part.ineqs() {
            let mut row = vec![BigInt::zero(); width];
            row[off..off + block].clone_from_slice(ineq);
            lp = lp.add_inequality(row)?;
        }
    }
    Ok(lp)
}

/// Rotate `facet` about `ridge` (a ridge of that facet) onto the
/// adjacent facet of the hull of `set`.
///
/// The set is first transformed so the facet and ridge become the first
/// two coordinates; the wrap LP is solved in that space, and its optimum
/// `a = n/d` combines the original rows as `-n * facet + d * ridge`.  An
/// unbounded LP means the hull is unbounded through this ridge and the
/// facet is returned unchanged.
fn wrap_facet(set: &Set, facet: &mut Constraint, ridge: &Constraint) -> Result<()> {
    let width = 1 + set.space().n_dim();
    let mut m = Mat::zero(3, width);
    m.set(0, 0, BigInt::one());
    m.row_mut(1).clone_from_slice(facet);
    m.row_mut(2).clone_from_slice(ridge);
    let t = m.right_inverse().ok_or_else(|| invariant("facet and ridge are dependent"))?;

    let tset = set.clone().preimage(&t)?;
    if tset.n() == 0 {
        return Err(invariant("wrapped set vanished"));
    }
    let lp = wrap_constraints(&tset)?;
    let block = 1 + tset.space().n_dim();
    let mut obj = vec![BigInt::zero(); 1 + block * tset.n()];
    for i in 0..tset.n() {
        obj[1 + block * i + 2] = BigInt::one();
    }

    match solve_lp(&lp, false, &obj, &BigInt::one())? {
        LpResult::Optimal { num, den } => {
            let f1 = -num;
            seq::combine(facet, &f1, &den, ridge);
            seq::normalize(facet);
            Ok(())
        }
        LpResult::Unbounded => Ok(()),
        LpResult::Empty => Err(invariant("wrap LP lost its feasible point")),
    }
}

/// From `dim` independent bounding hyperplanes, derive one facet of the
/// hull: repeatedly slice along the first bound, project the remaining
/// bounds onto the slice's affine hull, and wrap the first bound about
/// the last surviving one until the slice spans a hyperplane.
fn initial_facet_constraint(
    set: &mut Set,
    mut bounds: Vec<Constraint>,
) -> Result<Vec<Constraint>> {
    let dim = set.space().n_dim();
    if set.n() == 0 || bounds.len() != dim {
        return Err(invariant("bounding directions incomplete"));
    }

    while bounds.len() > 1 {
        let slice = set.clone().add_equality_to_parts(&bounds[0])?;
        let face = slice.affine_hull()?;
        if face.is_empty_flagged() {
            return Err(invariant("supporting hyperplane misses the set"));
        }
        if face.n_eq() == 1 {
            break;
        }
        let k = face.n_eq();
        let mut m = Mat::zero(1 + k, 1 + dim);
        m.set(0, 0, BigInt::one());
        for (i, eq) in face.eqs().iter().enumerate() {
            m.row_mut(1 + i).clone_from_slice(eq);
        }
        let u = m.right_inverse().ok_or(crate::Error::SingularMatrix)?;
        let q = u.right_inverse().ok_or(crate::Error::SingularMatrix)?;
        let u = u.drop_cols(1 + k, dim - k).drop_cols(0, 1);
        let q = q.drop_rows(1 + k, dim - k).drop_rows(0, 1);

        let refs: Vec<&[BigInt]> = bounds.iter().map(|r| r.as_slice()).collect();
        let projected = Mat::from_rows(&refs, 1 + dim).product(&u).product(&q);
        bounds.clear();
        for i in 0..projected.n_row() {
            let mut row = projected.row(i).to_vec();
            seq::normalize(&mut row);
            bounds.push(row);
        }
        while seq::first_non_zero(bounds.last().expect("bounds non-empty")).is_none() {
            bounds.pop();
            if bounds.len() <= 1 {
                return Err(invariant("bounds collapsed while slicing"));
            }
        }

        let ridge = bounds.last().expect("bounds non-empty").clone();
        let mut facet = bounds[0].clone();
        wrap_facet(set, &mut facet, &ridge)?;
        bounds[0] = facet;
        bounds.pop();
    }
    Ok(bounds)
}

/// Hyperplane description of the facet of the hull of `set` cut out by
/// the bounding constraint `c`: transform `c` onto the first coordinate,
/// hull the slice one dimension down, and lift the result back.
fn compute_facet(set: &Set, c: &Constraint) -> Result<BasicSet> {
    let dim = set.space().n_dim();
    let mut m = Mat::zero(2, 1 + dim);
    m.set(0, 0, BigInt::one());
    m.row_mut(1).clone_from_slice(c);
    let u = m.right_inverse().ok_or(crate::Error::SingularMatrix)?;
    let q = u.right_inverse().ok_or(crate::Error::SingularMatrix)?;
    let u = u.drop_cols(1, 1);
    let q = q.drop_rows(1, 1);

    let sliced = set.clone().preimage(&u)?;
    let facet_hull = uset_convex_hull_wrap_bounded(sliced)?;
    let facet = facet_hull.preimage(&q)?;
    if facet.n_eq() != 0 {
        return Err(invariant("facet description degenerated"));
    }
    Ok(facet)
}

/// Grow `hull` to the full facet description: for every facet found so
/// far, compute its ridges, and wrap the facet about each ridge that the
/// current approximation does not already account for.
fn extend(mut hull: BasicSet, set: &Set) -> Result<BasicSet> {
    if set.n() == 0 {
        return Err(invariant("extending over an empty union"));
    }
    let mut i = 0;
    while i < hull.n_ineq() {
        let facet_c = hull.ineq[i].clone();
        let facet = compute_facet(set, &facet_c)?
            .add_equality(facet_c.clone())?
            .gauss()
            .normalize_constraints();
        let hull_facet = hull
            .clone()
            .add_equality(facet_c.clone())?
            .gauss()
            .normalize_constraints();
        trace!(facet = i, ridges = facet.n_ineq(), "extending facet");

        for ridge in facet.ineqs() {
            if hull_facet.ineqs().iter().any(|h| h == ridge) {
                continue;
            }
            let mut row = hull.ineq[i].clone();
            wrap_facet(set, &mut row, ridge)?;
            hull.ineq.push(row);
        }
        i += 1;
    }
    hull.clear_derived_flags();
    Ok(hull.simplify().finalize())
}

struct MaxConstraint {
    row: Constraint,
    count: usize,
    ineq: bool,
}

/// Constraint-hash shortcut: inequalities of the part with the fewest
/// constraints whose translates appear in every other part are facets of
/// the hull outright.  If one of the parts turns out to carry exactly
/// those constraints, it already is the hull.
fn common_constraints(mut hull: BasicSet, set: &Set, is_hull: &mut bool) -> BasicSet {
    *is_hull = false;

    let mut best: Option<usize> = None;
    for (i, part) in set.parts().iter().enumerate() {
        if part.n_eq() != 0 {
            continue;
        }
        if best.map_or(true, |b| part.n_ineq() < set.parts()[b].n_ineq()) {
            best = Some(i);
        }
    }
    let Some(best) = best else {
        return hull;
    };

    let mut constraints: Vec<Option<MaxConstraint>> = Vec::new();
    let mut table: AHashMap<u64, Vec<usize>> = AHashMap::new();
    for row in set.parts()[best].ineqs() {
        let key = seq::hash_key(&row[1..]);
        let idx = constraints.len();
        constraints.push(Some(MaxConstraint {
            row: row.clone(),
            count: 0,
            ineq: true,
        }));
        table.entry(key).or_default().push(idx);
    }

    let find = |table: &AHashMap<u64, Vec<usize>>,
                constraints: &[Option<MaxConstraint>],
                coeffs: &[BigInt]|
     -> Option<usize> {
        let key = seq::hash_key(coeffs);
        table.get(&key)?.iter().copied().find(|&idx| {
            constraints[idx]
                .as_ref()
                .is_some_and(|c| c.row[1..] == *coeffs)
        })
    };

    let mut n = 0;
    for (s, part) in set.parts().iter().enumerate() {
        if s == best {
            continue;
        }
        let update = |constraints: &mut Vec<Option<MaxConstraint>>,
                      table: &AHashMap<u64, Vec<usize>>,
                      con: &Constraint,
                      n: usize,
                      ineq: bool| {
            let Some(idx) = find(table, constraints, &con[1..]) else {
                return;
            };
            let c = constraints[idx].as_mut().expect("found entries are live");
            if c.count < n {
                constraints[idx] = None;
                return;
            }
            c.count += 1;
            if c.row[0] > con[0] {
                return;
            }
            if c.row[0] == con[0] {
                if ineq {
                    c.ineq = true;
                }
                return;
            }
            c.row[0] = con[0].clone();
            c.ineq = ineq;
        };

        for eq in part.eqs() {
            let mut oriented = eq.clone();
            for _ in 0..2 {
                seq::neg(&mut oriented);
                update(&mut constraints, &table, &oriented, n, false);
            }
        }
        for ineq in part.ineqs() {
            update(&mut constraints, &table, ineq, n, part.n_eq() == 0);
        }
        n += 1;
    }

    for c in constraints.iter().flatten() {
        if c.count == n && c.ineq {
            hull.ineq.push(c.row.clone());
        }
    }

    for part in set.parts() {
        if part.n_eq() != 0 || part.n_ineq() != hull.n_ineq() {
            continue;
        }
        let all_present = part.ineqs().iter().all(|row| {
            find(&table, &constraints, &row[1..]).is_some_and(|idx| {
                let c = constraints[idx].as_ref().expect("found entries are live");
                c.count == n && c.row[0] == row[0]
            })
        });
        if all_present {
            *is_hull = true;
        }
    }
    hull
}

/// A hull template seeded with the obviously common facet constraints.
fn proto_hull(set: &Set, is_hull: &mut bool) -> BasicSet {
    let hull = BasicSet::universe(*set.space()).set_rational();
    common_constraints(hull, set, is_hull)
}

/// Seed `hull` with one genuine facet built from independent bounds.
fn initial_hull(hull: BasicSet, set: &mut Set) -> Result<BasicSet> {
    let bounds = independent_bounds(set)?;
    if bounds.len() != set.space().n_dim() {
        return Err(invariant("bounded union expected"));
    }
    let bounds = initial_facet_constraint(set, bounds)?;
    hull.add_inequality(bounds[0].clone())
}

/// Wrapping-based hull of a bounded, full-dimensional, pure union of at
/// least two parts.
pub(crate) fn uset_convex_hull_wrap(mut set: Set) -> Result<BasicSet> {
    let mut is_hull = false;
    let mut hull = proto_hull(&set, &mut is_hull);
    if !is_hull {
        if hull.n_ineq() == 0 {
            hull = initial_hull(hull, &mut set)?;
        }
        hull = extend(hull, &set)?;
    }
    Ok(hull)
}
