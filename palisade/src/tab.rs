//! Exact linear programming over basic sets.
//!
//! [`solve_lp`] minimizes (or maximizes) an affine objective over the
//! rational relaxation of one basic set.  [`Tab`] snapshots a basic set's
//! constraint system once and answers repeated queries against it:
//! minimization, implicit-equality detection, redundancy detection and
//! the recession-cone boundedness test.
//!
//! The solver is a dense two-phase simplex over `BigRational` with
//! Bland's rule, so every query terminates and every answer is exact.
//! `Unbounded` and `Empty` are ordinary outcomes, not errors; the hull
//! algorithms give them algorithmic meaning.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::{BasicSet, Constraint, Error, Result};

/// Outcome of an exact linear program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LpResult {
    /// The exact optimum `num / den`, with `den > 0` and the fraction
    /// reduced.
    Optimal { num: BigInt, den: BigInt },
    Unbounded,
    Empty,
}

impl LpResult {
    /// The optimum as a rational number, if any.
    pub fn value(&self) -> Option<BigRational> {
        match self {
            LpResult::Optimal { num, den } => Some(BigRational::new(num.clone(), den.clone())),
            _ => None,
        }
    }
}

fn rat(v: &BigInt) -> BigRational {
    BigRational::from_integer(v.clone())
}

/// Minimize (or maximize) `objective . (1, x) / denom` over the rational
/// relaxation of `bset`.
pub fn solve_lp(
    bset: &BasicSet,
    maximize: bool,
    objective: &[BigInt],
    denom: &BigInt,
) -> Result<LpResult> {
    if objective.len() != 1 + bset.total() {
        return Err(Error::DimRange);
    }
    if !denom.is_positive() {
        return Err(Error::Lp);
    }
    if bset.is_empty_flagged() {
        return Ok(LpResult::Empty);
    }
    lp_over_rows(bset.eqs(), bset.ineqs(), bset.total(), maximize, objective, denom)
}

fn lp_over_rows(
    eqs: &[Constraint],
    ineqs: &[Constraint],
    total: usize,
    maximize: bool,
    objective: &[BigInt],
    denom: &BigInt,
) -> Result<LpResult> {
    let mut obj: Vec<BigInt> = objective.to_vec();
    if maximize {
        palisade_core::seq::neg(&mut obj);
    }
    let outcome = Simplex::new(eqs, ineqs, total, &obj).solve()?;
    let outcome = match outcome {
        SimplexOutcome::Optimal(v) => {
            let v = v / rat(denom);
            let v = if maximize { -v } else { v };
            LpResult::Optimal {
                num: v.numer().clone(),
                den: v.denom().clone(),
            }
        }
        SimplexOutcome::Unbounded => LpResult::Unbounded,
        SimplexOutcome::Empty => LpResult::Empty,
    };
    Ok(outcome)
}

enum SimplexOutcome {
    Optimal(BigRational),
    Unbounded,
    Empty,
}

/// Dense two-phase simplex in standard form.
///
/// Free variables are split as `x = u - v` with `u, v >= 0`; each
/// inequality gets a surplus variable.  Columns are laid out as
/// `u_0..u_{d-1}, v_0..v_{d-1}, s_0..s_{m_ineq-1}` followed, during
/// phase one, by one artificial column per row.
struct Simplex {
    m: usize,
    n: usize,
    a: Vec<Vec<BigRational>>,
    b: Vec<BigRational>,
    basis: Vec<usize>,
    /// Original cost per non-artificial column.
    cost: Vec<BigRational>,
    cost_const: BigRational,
}

impl Simplex {
    fn new(eqs: &[Constraint], ineqs: &[Constraint], total: usize, obj: &[BigInt]) -> Self {
        let m = eqs.len() + ineqs.len();
        let n = 2 * total + ineqs.len();
        let mut a = vec![vec![BigRational::zero(); n]; m];
        let mut b = vec![BigRational::zero(); m];

        for (r, row) in eqs.iter().chain(ineqs.iter()).enumerate() {
            for j in 0..total {
                if row[1 + j].is_zero() {
                    continue;
                }
                a[r][j] = rat(&row[1 + j]);
                a[r][total + j] = -rat(&row[1 + j]);
            }
            b[r] = -rat(&row[0]);
        }
        for (k, _) in ineqs.iter().enumerate() {
            let r = eqs.len() + k;
            a[r][2 * total + k] = -BigRational::one();
        }

        let mut cost = vec![BigRational::zero(); n];
        for j in 0..total {
            if obj[1 + j].is_zero() {
                continue;
            }
            cost[j] = rat(&obj[1 + j]);
            cost[total + j] = -rat(&obj[1 + j]);
        }

        Simplex {
            m,
            n,
            a,
            b,
            basis: Vec::new(),
            cost,
            cost_const: rat(&obj[0]),
        }
    }

    /// Pivot on `(r, c)`: scale row `r` so the pivot becomes one and
    /// clear column `c` from every other row and from `zrow`.
    fn pivot(&mut self, r: usize, c: usize, zrow: &mut Vec<BigRational>) {
        let p = self.a[r][c].clone();
        debug_assert!(!p.is_zero(), "pivot on a zero entry");
        for v in self.a[r].iter_mut() {
            if !v.is_zero() {
                let t = std::mem::replace(v, BigRational::zero());
                *v = t / &p;
            }
        }
        self.b[r] = std::mem::replace(&mut self.b[r], BigRational::zero()) / &p;

        for r2 in 0..self.m {
            if r2 == r || self.a[r2][c].is_zero() {
                continue;
            }
            let f = self.a[r2][c].clone();
            for j in 0..self.a[r].len() {
                if self.a[r][j].is_zero() {
                    continue;
                }
                let t = std::mem::replace(&mut self.a[r2][j], BigRational::zero());
                self.a[r2][j] = t - &f * &self.a[r][j];
            }
            let t = std::mem::replace(&mut self.b[r2], BigRational::zero());
            self.b[r2] = t - &f * &self.b[r];
        }
        if !zrow[c].is_zero() {
            let f = zrow[c].clone();
            for j in 0..self.a[r].len() {
                if self.a[r][j].is_zero() {
                    continue;
                }
                let t = std::mem::replace(&mut zrow[j], BigRational::zero());
                zrow[j] = t - &f * &self.a[r][j];
            }
        }
        self.basis[r] = c;
    }

    /// Bland's rule main loop on the reduced cost row `zrow`.
    /// Returns `false` when the objective is unbounded below.
    fn optimize(&mut self, zrow: &mut Vec<BigRational>) -> bool {
        loop {
            let Some(c) = (0..zrow.len()).find(|&j| zrow[j].is_negative()) else {
                return true;
            };
            let mut leave: Option<usize> = None;
            let mut best: Option<BigRational> = None;
            for r in 0..self.m {
                if !self.a[r][c].is_positive() {
                    continue;
                }
                let ratio = &self.b[r] / &self.a[r][c];
                let better = match &best {
                    None => true,
                    Some(cur) => {
                        ratio < *cur
                            || (ratio == *cur
                                && self.basis[r] < self.basis[leave.expect("leave set with best")])
                    }
                };
                if better {
                    best = Some(ratio);
                    leave = Some(r);
                }
            }
            let Some(r) = leave else {
                return false;
            };
            self.pivot(r, c, zrow);
        }
    }

    fn solve(mut self) -> Result<SimplexOutcome> {
        // Phase one: append artificials and drive their sum to zero.
        for r in 0..self.m {
            if self.b[r].is_negative() {
                for v in self.a[r].iter_mut() {
                    if !v.is_zero() {
                        let t = std::mem::replace(v, BigRational::zero());
                        *v = -t;
                    }
                }
                let t = std::mem::replace(&mut self.b[r], BigRational::zero());
                self.b[r] = -t;
            }
        }
        for r in 0..self.m {
            for r2 in 0..self.m {
                self.a[r2].push(if r2 == r {
                    BigRational::one()
                } else {
                    BigRational::zero()
                });
            }
            self.basis.push(self.n + r);
        }

        // Reduced costs of the phase-one objective (sum of artificials)
        // with the artificial basis already priced out.
        let mut zrow = vec![BigRational::zero(); self.n + self.m];
        for j in 0..self.n {
            let mut s = BigRational::zero();
            for r in 0..self.m {
                if !self.a[r][j].is_zero() {
                    s += &self.a[r][j];
                }
            }
            zrow[j] = -s;
        }
        if !self.optimize(&mut zrow) {
            return Err(Error::Lp);
        }
        let mut infeasibility = BigRational::zero();
        for r in 0..self.m {
            if self.basis[r] >= self.n {
                infeasibility += &self.b[r];
            }
        }
        if infeasibility.is_positive() {
            return Ok(SimplexOutcome::Empty);
        }

        // Drive leftover artificials out of the basis; a row that offers
        // no pivot is redundant and is cleared in place.
        let mut drop_rows: Vec<usize> = Vec::new();
        for r in 0..self.m {
            if self.basis[r] < self.n {
                continue;
            }
            debug_assert!(self.b[r].is_zero(), "basic artificial with non-zero value");
            match (0..self.n).find(|&j| !self.a[r][j].is_zero()) {
                Some(c) => {
                    let mut dummy = vec![BigRational::zero(); self.n + self.m];
                    self.pivot(r, c, &mut dummy);
                }
                None => drop_rows.push(r),
            }
        }
        for &r in drop_rows.iter().rev() {
            self.a.remove(r);
            self.b.remove(r);
            self.basis.remove(r);
            self.m -= 1;
        }
        for row in self.a.iter_mut() {
            row.truncate(self.n);
        }

        // Phase two: price out the basis from the real objective.
        let mut zrow = self.cost.clone();
        for r in 0..self.m {
            let cb = self.cost[self.basis[r]].clone();
            if cb.is_zero() {
                continue;
            }
            for j in 0..self.n {
                if self.a[r][j].is_zero() {
                    continue;
                }
                let t = std::mem::replace(&mut zrow[j], BigRational::zero());
                zrow[j] = t - &cb * &self.a[r][j];
            }
        }
        if !self.optimize(&mut zrow) {
            return Ok(SimplexOutcome::Unbounded);
        }

        let mut value = self.cost_const.clone();
        for r in 0..self.m {
            let cb = &self.cost[self.basis[r]];
            if !cb.is_zero() {
                value += cb * &self.b[r];
            }
        }
        Ok(SimplexOutcome::Optimal(value))
    }
}

/// A reusable query context for one basic set.
///
/// The snapshot keeps the equalities and inequalities in their original
/// order, so the marks computed by the detection passes line up with the
/// basic set they came from.
#[derive(Clone, Debug)]
pub struct Tab {
    total: usize,
    eqs: Vec<Constraint>,
    ineqs: Vec<Constraint>,
    implicit: Vec<bool>,
    redundant: Vec<bool>,
    empty: bool,
}

impl Tab {
    pub fn from_basic_set(bset: &BasicSet) -> Self {
        Tab {
            total: bset.total(),
            eqs: bset.eqs().to_vec(),
            ineqs: bset.ineqs().to_vec(),
            implicit: vec![false; bset.n_ineq()],
            redundant: vec![false; bset.n_ineq()],
            empty: bset.is_empty_flagged(),
        }
    }

    /// The tableau of the recession cone: every constant dropped, so the
    /// rows describe `{ x : E x = 0, A x >= 0 }`.
    pub fn from_recession_cone(bset: &BasicSet) -> Self {
        let zero_const = |row: &Constraint| -> Constraint {
            let mut r = row.clone();
            r[0] = BigInt::zero();
            r
        };
        Tab {
            total: bset.total(),
            eqs: bset.eqs().iter().map(zero_const).collect(),
            ineqs: bset.ineqs().iter().map(zero_const).collect(),
            implicit: vec![false; bset.n_ineq()],
            redundant: vec![false; bset.n_ineq()],
            empty: bset.is_empty_flagged(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn implicit_marks(&self) -> &[bool] {
        &self.implicit
    }

    pub fn redundant_marks(&self) -> &[bool] {
        &self.redundant
    }

    /// Minimize `objective . (1, x) / denom` over the snapshot.
    pub fn min(&self, objective: &[BigInt], denom: &BigInt) -> Result<LpResult> {
        if objective.len() != 1 + self.total {
            return Err(Error::DimRange);
        }
        if self.empty {
            return Ok(LpResult::Empty);
        }
        lp_over_rows(&self.eqs, &self.ineqs, self.total, false, objective, denom)
    }

    fn max(&self, objective: &[BigInt]) -> Result<LpResult> {
        if self.empty {
            return Ok(LpResult::Empty);
        }
        lp_over_rows(
            &self.eqs,
            &self.ineqs,
            self.total,
            true,
            objective,
            &BigInt::one(),
        )
    }

    /// Mark every inequality whose maximum over the set is zero: such a
    /// constraint can only be attained with equality.  Detects emptiness
    /// along the way.
    pub fn detect_implicit_equalities(&mut self) -> Result<()> {
        for i in 0..self.ineqs.len() {
            if self.empty {
                return Ok(());
            }
            if self.implicit[i] {
                continue;
            }
            let row = self.ineqs[i].clone();
            match self.max(&row)? {
                LpResult::Empty => self.empty = true,
                LpResult::Unbounded => {}
                LpResult::Optimal { num, .. } => {
                    if num.is_zero() {
                        self.implicit[i] = true;
                        // Treat it as an equality for the remaining queries.
                        self.eqs.push(row);
                    } else if num.is_negative() {
                        self.empty = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Mark every inequality implied by the rest of the system: the
    /// minimum of its row over the others is non-negative.  Marked rows
    /// drop out of the system for the remaining tests, so of two
    /// identical rows exactly one survives.
    pub fn detect_redundant(&mut self) -> Result<()> {
        for i in 0..self.ineqs.len() {
            if self.empty {
                return Ok(());
            }
            if self.implicit[i] || self.redundant[i] {
                continue;
            }
            let others: Vec<Constraint> = self
                .ineqs
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i && !self.redundant[j])
                .map(|(_, r)| r.clone())
                .collect();
            match lp_over_rows(
                &self.eqs,
                &others,
                self.total,
                false,
                &self.ineqs[i],
                &BigInt::one(),
            )? {
                LpResult::Empty => self.empty = true,
                LpResult::Unbounded => {}
                LpResult::Optimal { num, .. } => {
                    if !num.is_negative() {
                        self.redundant[i] = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// The recession cone degenerates to the origin: every coordinate
    /// direction attains its maximum and minimum (both zero) over the
    /// cone.
    pub fn cone_is_bounded(&self) -> Result<bool> {
        if self.empty {
            return Ok(true);
        }
        for col in 0..self.total {
            let mut obj = vec![BigInt::zero(); 1 + self.total];
            obj[1 + col] = BigInt::one();
            if matches!(self.max(&obj)?, LpResult::Unbounded) {
                return Ok(false);
            }
            if matches!(self.min(&obj, &BigInt::one())?, LpResult::Unbounded) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Rewrite `bset` from the marks of `tab`: implicit equalities promoted,
/// redundant inequalities dropped.
pub fn update_from_tab(mut bset: BasicSet, tab: &Tab) -> BasicSet {
    if tab.empty {
        return bset.set_to_empty();
    }
    debug_assert_eq!(
        bset.n_ineq(),
        tab.implicit.len(),
        "tableau marks out of step with the basic set"
    );
    let mut ineq = Vec::with_capacity(bset.n_ineq());
    for (i, row) in bset.ineq.drain(..).enumerate() {
        if tab.implicit[i] {
            bset.eq.push(row);
        } else if !tab.redundant[i] {
            ineq.push(row);
        }
    }
    bset.ineq = ineq;
    bset.gauss()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Space;

    fn bset(eqs: &[&[i64]], ineqs: &[&[i64]], dim: usize) -> BasicSet {
        BasicSet::from_rows(Space::set_space(0, dim), eqs, ineqs).unwrap()
    }

    fn opt(r: LpResult) -> (i64, i64) {
        match r {
            LpResult::Optimal { num, den } => {
                (i64::try_from(&num).unwrap(), i64::try_from(&den).unwrap())
            }
            other => panic!("expected an optimum, got {other:?}"),
        }
    }

    #[test]
    fn minimizes_over_a_box() {
        // 0 <= x <= 5, 1 <= y <= 3: min x + y = 1, max x + y = 8.
        let b = bset(
            &[],
            &[&[0, 1, 0], &[5, -1, 0], &[-1, 0, 1], &[3, 0, -1]],
            2,
        );
        let obj = crate::basic::row_from_i64(&[0, 1, 1]);
        let one = BigInt::one();
        assert_eq!(opt(solve_lp(&b, false, &obj, &one).unwrap()), (1, 1));
        assert_eq!(opt(solve_lp(&b, true, &obj, &one).unwrap()), (8, 1));
    }

    #[test]
    fn rational_optimum_is_exact() {
        // 3x >= 1, x <= 1: min x = 1/3.
        let b = bset(&[], &[&[-1, 3], &[1, -1]], 1);
        let obj = crate::basic::row_from_i64(&[0, 1]);
        assert_eq!(opt(solve_lp(&b, false, &obj, &BigInt::one()).unwrap()), (1, 3));
    }

    #[test]
    fn detects_unbounded_and_empty() {
        let b = bset(&[], &[&[0, 1]], 1);
        let obj = crate::basic::row_from_i64(&[0, 1]);
        let one = BigInt::one();
        assert_eq!(solve_lp(&b, true, &obj, &one).unwrap(), LpResult::Unbounded);
        assert_eq!(opt(solve_lp(&b, false, &obj, &one).unwrap()), (0, 1));

        let e = bset(&[], &[&[-2, 1], &[1, -1]], 1);
        assert_eq!(solve_lp(&e, false, &obj, &one).unwrap(), LpResult::Empty);
    }

    #[test]
    fn equalities_constrain_the_optimum() {
        // x + y = 4, x >= 1, y >= 1: min x = 1, max x = 3.
        let b = bset(&[&[-4, 1, 1]], &[&[-1, 1, 0], &[-1, 0, 1]], 2);
        let obj = crate::basic::row_from_i64(&[0, 1, 0]);
        let one = BigInt::one();
        assert_eq!(opt(solve_lp(&b, false, &obj, &one).unwrap()), (1, 1));
        assert_eq!(opt(solve_lp(&b, true, &obj, &one).unwrap()), (3, 1));
    }

    #[test]
    fn objective_constant_and_denominator() {
        let b = bset(&[], &[&[0, 1], &[4, -1]], 1);
        // min (2x + 6) / 2 = 3.
        let obj = crate::basic::row_from_i64(&[6, 2]);
        assert_eq!(
            opt(solve_lp(&b, false, &obj, &BigInt::from(2)).unwrap()),
            (3, 1)
        );
    }

    #[test]
    fn implicit_equalities_are_detected() {
        // x >= 0, -x >= 0, 0 <= y <= 1: x is implicitly zero.
        let b = bset(&[], &[&[0, 1, 0], &[0, -1, 0], &[0, 0, 1], &[1, 0, -1]], 2);
        let mut tab = Tab::from_basic_set(&b);
        tab.detect_implicit_equalities().unwrap();
        assert_eq!(tab.implicit_marks(), &[true, true, false, false]);
        let b = update_from_tab(b, &tab);
        assert_eq!(b.n_eq(), 1);
    }

    #[test]
    fn redundancy_detection_keeps_one_of_identical_rows() {
        // x >= 2 twice plus x >= 0: two of the three are redundant.
        let b = bset(&[], &[&[-2, 1], &[-2, 1], &[0, 1], &[9, -1]], 1);
        let mut tab = Tab::from_basic_set(&b);
        tab.detect_redundant().unwrap();
        assert_eq!(tab.redundant_marks(), &[true, false, true, false]);
    }

    #[test]
    fn recession_cone_boundedness() {
        // A bounded box has a trivial cone.
        let b = bset(&[], &[&[0, 1, 0], &[5, -1, 0], &[0, 0, 1], &[5, 0, -1]], 2);
        assert!(Tab::from_recession_cone(&b).cone_is_bounded().unwrap());

        // A half-space does not.
        let h = bset(&[], &[&[0, 1, 0]], 2);
        assert!(!Tab::from_recession_cone(&h).cone_is_bounded().unwrap());
    }
}
