//! The simple hull: the tightest superset describable with relaxed
//! translates of the input's own constraints.
//!
//! Every candidate inequality is drawn from some part, looked up in
//! per-part hash tables keyed on the coefficient vector with the
//! constant excluded (equalities are indexed under both orientations),
//! and either relaxed via an LP minimum over each other part or rejected
//! outright when some part is unbounded in its direction.

use ahash::{AHashMap, AHashSet};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use palisade_core::seq;

use crate::hull::invariant;
use crate::tab::{LpResult, Tab};
use crate::{BasicSet, Constraint, Error, Result, Set};

/// Per-call scratch state: the hull's own constraint index plus, for
/// each part, a constraint index and a lazily built tableau.  Lives for
/// the duration of one simple hull computation.
///
/// The tables are keyed on the exact coefficient vector: translates
/// match only in the same orientation, and an equality is indexed under
/// both of its orientations.
struct ShData {
    hull_table: AHashSet<Vec<BigInt>>,
    parts: Vec<ShPart>,
}

struct ShPart {
    table: AHashMap<Vec<BigInt>, Constraint>,
    tab: Option<Tab>,
}

impl ShData {
    fn new(set: &Set) -> Self {
        let mut parts = Vec::with_capacity(set.n());
        for part in set.parts() {
            let mut table = AHashMap::with_capacity(2 * part.n_eq() + part.n_ineq());
            for eq in part.eqs() {
                table.entry(eq[1..].to_vec()).or_insert_with(|| eq.clone());
                let mut neg = eq.clone();
                seq::neg(&mut neg);
                table.entry(neg[1..].to_vec()).or_insert(neg);
            }
            for ineq in part.ineqs() {
                table
                    .entry(ineq[1..].to_vec())
                    .or_insert_with(|| ineq.clone());
            }
            parts.push(ShPart { table, tab: None });
        }
        ShData {
            hull_table: AHashSet::new(),
            parts,
        }
    }

    fn tab(&mut self, j: usize, set: &Set) -> &Tab {
        self.parts[j]
            .tab
            .get_or_insert_with(|| Tab::from_basic_set(&set.parts()[j]))
    }
}

/// Check whether `ineq` is, or can be relaxed into, a bound on part `j`;
/// on success the constant has been relaxed by the (floored) minimum.
fn is_bound(data: &mut ShData, set: &Set, j: usize, ineq: &mut Constraint) -> Result<bool> {
    match data.tab(j, set).min(ineq, &BigInt::one())? {
        LpResult::Optimal { num, den } => {
            if num.is_negative() {
                ineq[0] -= num.div_floor(&den);
            }
            Ok(true)
        }
        LpResult::Unbounded => Ok(false),
        LpResult::Empty => Err(Error::Lp),
    }
}

/// Try to turn one inequality of part `i` into a bound on the whole set
/// and add it to `hull`.
///
/// Translates already accounted for (in the hull, or in an earlier part,
/// which a previous iteration has fully considered) are skipped.  For
/// later parts a translate found in the part's own table updates the
/// constant without an LP; otherwise the part is probed with an LP and
/// the constraint rolled back if the direction is unbounded on it.
fn add_bound(
    mut hull: BasicSet,
    data: &mut ShData,
    set: &Set,
    i: usize,
    ineq: &Constraint,
) -> Result<BasicSet> {
    let key = ineq[1..].to_vec();
    if data.hull_table.contains(&key) {
        return Ok(hull);
    }
    for part in &data.parts[..i] {
        if part.table.contains_key(&key) {
            return Ok(hull);
        }
    }

    hull.ineq.push(ineq.clone());
    let k = hull.n_ineq() - 1;

    for j in 0..set.n() {
        if j == i {
            continue;
        }
        if j > i {
            if let Some(row_j) = data.parts[j].table.get(&key) {
                if row_j[0] > hull.ineq[k][0] {
                    hull.ineq[k][0] = row_j[0].clone();
                }
                continue;
            }
        }
        let mut row = std::mem::take(&mut hull.ineq[k]);
        let bound = is_bound(data, set, j, &mut row)?;
        hull.ineq[k] = row;
        if !bound {
            hull.pop_inequality();
            return Ok(hull);
        }
    }

    data.hull_table.insert(key);
    Ok(hull)
}

/// Feed every constraint of part `i` (equalities in both orientations)
/// through [`add_bound`].
fn add_bounds(mut hull: BasicSet, data: &mut ShData, set: &Set, i: usize) -> Result<BasicSet> {
    let part = &set.parts()[i];
    for eq in part.eqs() {
        let mut oriented = eq.clone();
        for _ in 0..2 {
            seq::neg(&mut oriented);
            hull = add_bound(hull, data, set, i, &oriented)?;
        }
    }
    for ineq in part.ineqs() {
        hull = add_bound(hull, data, set, i, ineq)?;
    }
    Ok(hull)
}

/// Superset of the hull of a pure set described only by translates of
/// the set's own constraints, canonicalized at the end.
pub(crate) fn uset_simple_hull(mut set: Set) -> Result<BasicSet> {
    // Empty parts never make it to the relaxation loop; dropping them
    // here keeps the constraint rows of the live parts untouched.
    let mut live = Vec::with_capacity(set.n());
    for part in set.parts.drain(..) {
        if !part.is_empty()? {
            live.push(part);
        }
    }
    set.parts = live;
    if set.n() == 0 {
        return Ok(BasicSet::empty(*set.space()));
    }

    let mut hull = set.clone().affine_hull()?;
    if hull.is_empty_flagged() {
        return Ok(hull);
    }
    let mut data = ShData::new(&set);
    for eq in hull.eqs() {
        data.hull_table.insert(eq[1..].to_vec());
        let mut neg = eq[1..].to_vec();
        seq::neg(&mut neg);
        data.hull_table.insert(neg);
    }

    for i in 0..set.n() {
        hull = add_bounds(hull, &mut data, &set, i)?;
    }

    hull.convex_hull()
}

impl Set {
    /// Intersect the simple hull with per-dimension bounds wherever the
    /// hull fails to pin a set dimension between symbolic constants.
    pub fn bounded_simple_hull(self) -> Result<BasicSet> {
        let set = self;
        let mut hull = set.clone().simple_hull()?;
        let n_param = hull.space().n_param;
        let n_dim = hull.space().n_out;
        let mut divless: Option<Set> = None;

        for i in 0..n_dim {
            let col = 1 + n_param + i;
            if hull.is_empty_flagged() {
                break;
            }

            let pinned_by_equality = hull.eqs().iter().any(|eq| {
                !eq[col].is_zero() && seq::first_non_zero(&eq[col + 1..]).is_none()
            });
            if pinned_by_equality {
                continue;
            }

            let mut lower = false;
            let mut upper = false;
            for row in hull.ineqs() {
                if row[col].is_zero() {
                    continue;
                }
                if seq::first_non_zero(&row[col + 1..]).is_some()
                    || seq::first_non_zero(&row[1 + n_param..col]).is_some()
                {
                    continue;
                }
                if row[col].is_positive() {
                    lower = true;
                } else {
                    upper = true;
                }
                if lower && upper {
                    break;
                }
            }
            if lower && upper {
                continue;
            }

            let base = divless
                .get_or_insert_with(|| set.clone().remove_divs())
                .clone();
            let bounds = set_bounds(base, i)?;
            hull = hull.intersect(bounds)?;
        }
        Ok(hull)
    }
}

/// Parametric bounds on dimension `i` of the set: eliminate every other
/// set dimension and hull the projection.
fn set_bounds(set: Set, i: usize) -> Result<BasicSet> {
    let n_dim = set.space().n_dim();
    if i >= n_dim {
        return Err(invariant("bounded dimension out of range"));
    }
    let set = set
        .eliminate_dims(i + 1, n_dim - (i + 1))?
        .eliminate_dims(0, i)?;
    set.convex_hull()
}
