//! Basic sets: single convex pieces described by integer constraints.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};
use palisade_core::{mat::Mat, seq};
use smallvec::SmallVec;

use crate::{Error, Result, Space};

/// One constraint row: the constant term followed by one coefficient per
/// parameter, dimension and division, meaning `c[0] + sum c[i] x_i >= 0`
/// (or `= 0` for an equality).
pub type Constraint = Vec<BigInt>;

/// An integer division `q = floor(row / denom)` over the other columns.
/// The row has the full constraint width with the division's own column
/// zero.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Div {
    pub denom: BigInt,
    pub row: Constraint,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub(crate) struct Flags(u8);

impl Flags {
    pub(crate) const EMPTY: u8 = 1 << 0;
    pub(crate) const NO_REDUNDANT: u8 = 1 << 1;
    pub(crate) const NO_IMPLICIT: u8 = 1 << 2;
    pub(crate) const RATIONAL: u8 = 1 << 3;
    pub(crate) const FINAL: u8 = 1 << 4;

    #[inline]
    pub(crate) fn has(self, f: u8) -> bool {
        self.0 & f != 0
    }

    #[inline]
    pub(crate) fn set(&mut self, f: u8) {
        self.0 |= f;
    }

    #[inline]
    pub(crate) fn clear(&mut self, f: u8) {
        self.0 &= !f;
    }
}

/// A conjunction of integer linear equalities and inequalities: one
/// convex polyhedral piece.
///
/// Operations follow a move discipline: they consume the receiver and
/// return the (possibly rewritten) value, so a caller never observes a
/// stale handle.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BasicSet {
    pub(crate) space: Space,
    pub(crate) eq: Vec<Constraint>,
    pub(crate) ineq: Vec<Constraint>,
    pub(crate) divs: Vec<Div>,
    pub(crate) flags: Flags,
}

pub(crate) fn row_from_i64(row: &[i64]) -> Constraint {
    row.iter().map(|&v| BigInt::from(v)).collect()
}

impl BasicSet {
    pub fn universe(space: Space) -> Self {
        Self {
            space,
            eq: Vec::new(),
            ineq: Vec::new(),
            divs: Vec::new(),
            flags: Flags::default(),
        }
    }

    pub fn empty(space: Space) -> Self {
        Self::universe(space).set_to_empty()
    }

    /// Replace the description by the canonical flagged-empty form.
    pub fn set_to_empty(mut self) -> Self {
        let mut row = vec![BigInt::zero(); 1 + self.space.total()];
        row[0] = BigInt::from(1);
        self.eq = vec![row];
        self.ineq.clear();
        self.flags.set(Flags::EMPTY);
        self
    }

    /// Build a basic set from `i64` rows, mostly a convenience for tests
    /// and small callers.
    pub fn from_rows(space: Space, eqs: &[&[i64]], ineqs: &[&[i64]]) -> Result<Self> {
        let mut bset = Self::universe(space);
        for r in eqs {
            bset = bset.add_equality(row_from_i64(r))?;
        }
        for r in ineqs {
            bset = bset.add_inequality(row_from_i64(r))?;
        }
        Ok(bset)
    }

    #[inline]
    pub fn space(&self) -> &Space {
        &self.space
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.space.total()
    }

    #[inline]
    pub fn n_eq(&self) -> usize {
        self.eq.len()
    }

    #[inline]
    pub fn n_ineq(&self) -> usize {
        self.ineq.len()
    }

    #[inline]
    pub fn eqs(&self) -> &[Constraint] {
        &self.eq
    }

    #[inline]
    pub fn ineqs(&self) -> &[Constraint] {
        &self.ineq
    }

    #[inline]
    pub fn divs(&self) -> &[Div] {
        &self.divs
    }

    #[inline]
    pub fn is_empty_flagged(&self) -> bool {
        self.flags.has(Flags::EMPTY)
    }

    #[inline]
    pub fn is_rational(&self) -> bool {
        self.flags.has(Flags::RATIONAL)
    }

    /// No constraints at all.
    pub fn is_universe(&self) -> bool {
        !self.is_empty_flagged() && self.eq.is_empty() && self.ineq.is_empty()
    }

    pub fn set_rational(mut self) -> Self {
        self.flags.set(Flags::RATIONAL);
        self
    }

    pub fn finalize(mut self) -> Self {
        self.flags.set(Flags::FINAL);
        self
    }

    #[inline]
    pub(crate) fn clear_derived_flags(&mut self) {
        self.flags
            .clear(Flags::NO_REDUNDANT | Flags::NO_IMPLICIT | Flags::FINAL);
    }

    fn check_row(&self, row: &Constraint) -> Result<()> {
        if row.len() != 1 + self.space.total() {
            return Err(Error::DimRange);
        }
        Ok(())
    }

    pub fn add_equality(mut self, row: Constraint) -> Result<Self> {
        self.check_row(&row)?;
        self.clear_derived_flags();
        self.eq.push(row);
        Ok(self)
    }

    pub fn add_inequality(mut self, row: Constraint) -> Result<Self> {
        self.check_row(&row)?;
        self.clear_derived_flags();
        self.ineq.push(row);
        Ok(self)
    }

    pub(crate) fn pop_inequality(&mut self) {
        self.ineq.pop();
        self.clear_derived_flags();
    }

    /// Gaussian elimination on the equalities: bring them into echelon
    /// form (pivoting from the last column towards the first), substitute
    /// the pivots into the inequalities and division definitions, and
    /// detect trivially contradictory leftovers.
    pub fn gauss(mut self) -> Self {
        if self.is_empty_flagged() || self.eq.is_empty() {
            return self;
        }
        let total = self.space.total();
        let mut done = 0;
        for col in (1..=total).rev() {
            if done == self.eq.len() {
                break;
            }
            let Some(k) = (done..self.eq.len()).find(|&k| !self.eq[k][col].is_zero()) else {
                continue;
            };
            self.eq.swap(done, k);
            if self.eq[done][col].is_negative() {
                seq::neg(&mut self.eq[done]);
            }
            let pivot = self.eq[done].clone();
            for (k, row) in self.eq.iter_mut().enumerate() {
                if k != done && !row[col].is_zero() {
                    seq::elim(row, &pivot, col);
                }
            }
            for row in self.ineq.iter_mut() {
                if !row[col].is_zero() {
                    seq::elim(row, &pivot, col);
                }
            }
            for div in self.divs.iter_mut() {
                if !div.row[col].is_zero() {
                    seq::elim(&mut div.row, &pivot, col);
                }
            }
            done += 1;
        }
        let mut empty = false;
        for k in done..self.eq.len() {
            debug_assert!(
                seq::is_zero(&self.eq[k][1..]),
                "leftover equality with non-zero coefficients"
            );
            if !self.eq[k][0].is_zero() {
                empty = true;
            }
        }
        self.eq.truncate(done);
        if empty {
            return self.set_to_empty();
        }
        self
    }

    /// Divide every constraint by its content.  On rational pieces the
    /// constant takes part in the content; on integer pieces the constant
    /// of an inequality is floored (which only sharpens towards the
    /// integer lattice) and an equality with an indivisible constant has
    /// no solutions.
    pub fn normalize_constraints(mut self) -> Self {
        if self.is_empty_flagged() {
            return self;
        }
        let rational = self.is_rational();
        let mut empty = false;
        for row in self.eq.iter_mut() {
            if rational {
                seq::normalize(row);
                continue;
            }
            let g = seq::content(&row[1..]);
            if g.is_zero() {
                continue;
            }
            if !(&row[0] % &g).is_zero() {
                empty = true;
                break;
            }
            for v in row.iter_mut() {
                let t = std::mem::take(v);
                *v = t / &g;
            }
        }
        if empty {
            return self.set_to_empty();
        }
        for row in self.ineq.iter_mut() {
            if rational {
                seq::normalize(row);
                continue;
            }
            let g = seq::content(&row[1..]);
            if g.is_zero() || g == BigInt::from(1) {
                continue;
            }
            let c = std::mem::take(&mut row[0]);
            row[0] = c.div_floor(&g);
            for v in row[1..].iter_mut() {
                let t = std::mem::take(v);
                *v = t / &g;
            }
        }
        self
    }

    /// Gauss, normalize, drop trivial and duplicate constraints, fold
    /// opposite inequality pairs into equalities, detect emptiness.
    pub fn simplify(mut self) -> Self {
        loop {
            self = self.gauss();
            if self.is_empty_flagged() {
                return self;
            }
            self = self.normalize_constraints();
            if self.is_empty_flagged() {
                return self;
            }

            // Trivial rows.
            let mut empty = false;
            self.eq.retain(|row| {
                if seq::first_non_zero(&row[1..]).is_some() {
                    return true;
                }
                if !row[0].is_zero() {
                    empty = true;
                }
                false
            });
            self.ineq.retain(|row| {
                if seq::first_non_zero(&row[1..]).is_some() {
                    return true;
                }
                if row[0].is_negative() {
                    empty = true;
                }
                false
            });
            if empty {
                return self.set_to_empty();
            }

            match self.dedup_inequalities() {
                Dedup::Empty => return self.set_to_empty(),
                Dedup::Promoted => continue,
                Dedup::Done => return self,
            }
        }
    }

    /// Deduplicate parallel inequalities (keeping the tightest) and fold
    /// opposite pairs whose constants meet into an equality.
    fn dedup_inequalities(&mut self) -> Dedup {
        use ahash::AHashMap;

        if self.ineq.len() <= 1 {
            return Dedup::Done;
        }
        let mut table: AHashMap<u64, SmallVec<[usize; 4]>> = AHashMap::new();
        let mut keep: Vec<bool> = vec![true; self.ineq.len()];
        let mut promoted: Vec<Constraint> = Vec::new();

        for i in 0..self.ineq.len() {
            if !keep[i] {
                continue;
            }
            let key = canonical_key(&self.ineq[i][1..]);
            let mut dropped = false;
            if let Some(bucket) = table.get(&key) {
                for &j in bucket {
                    if !keep[j] {
                        continue;
                    }
                    if self.ineq[i][1..] == self.ineq[j][1..] {
                        if self.ineq[i][0] < self.ineq[j][0] {
                            let row = self.ineq[i].clone();
                            self.ineq[j] = row;
                        }
                        dropped = true;
                        break;
                    }
                    if seq::is_neg(&self.ineq[i][1..], &self.ineq[j][1..]) {
                        let sum = &self.ineq[i][0] + &self.ineq[j][0];
                        if sum.is_negative() {
                            return Dedup::Empty;
                        }
                        if sum.is_zero() {
                            promoted.push(self.ineq[i].clone());
                            keep[j] = false;
                            dropped = true;
                            break;
                        }
                    }
                }
            }
            if dropped {
                keep[i] = false;
            } else {
                table.entry(key).or_default().push(i);
            }
        }

        let mut idx = 0;
        self.ineq.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
        if promoted.is_empty() {
            return Dedup::Done;
        }
        self.eq.append(&mut promoted);
        Dedup::Promoted
    }

    /// Substitute `x = T z` through an integer homogeneous transform:
    /// every constraint row becomes `row * T`.  Only division-free pieces
    /// can be transformed.
    pub fn preimage(mut self, t: &Mat) -> Result<Self> {
        if !self.divs.is_empty() {
            return Err(Error::Invariant("preimage on a piece with divisions"));
        }
        if t.n_row() != 1 + self.space.total() {
            return Err(Error::DimRange);
        }
        let space = Space::underlying(t.n_col() - 1);
        let rational = self.is_rational();
        let empty = self.is_empty_flagged();
        let eq = self.eq.drain(..).map(|row| t.apply_to_row(&row)).collect();
        let ineq = self.ineq.drain(..).map(|row| t.apply_to_row(&row)).collect();
        let mut out = BasicSet {
            space,
            eq,
            ineq,
            divs: Vec::new(),
            flags: Flags::default(),
        };
        if rational {
            out.flags.set(Flags::RATIONAL);
        }
        if empty {
            return Ok(out.set_to_empty());
        }
        Ok(out.simplify())
    }

    /// Conjunction with `other` (same parameters and dimensions; the
    /// divisions are concatenated).
    pub fn intersect(mut self, mut other: BasicSet) -> Result<Self> {
        if !self.space.compatible(&other.space) {
            return Err(Error::SpaceMismatch);
        }
        if self.is_empty_flagged() {
            return Ok(self);
        }
        if other.is_empty_flagged() {
            other.space = self.space;
            other.divs = Vec::new();
            return Ok(other.set_to_empty());
        }
        let div_col = self.space.div_col();
        let (nd1, nd2) = (self.space.n_div, other.space.n_div);
        let widen1 = |row: &mut Constraint| {
            row.extend(std::iter::repeat_with(BigInt::zero).take(nd2));
        };
        let widen2 = |row: &Constraint| -> Constraint {
            let mut out = Vec::with_capacity(row.len() + nd1);
            out.extend_from_slice(&row[..div_col]);
            out.extend(std::iter::repeat_with(BigInt::zero).take(nd1));
            out.extend_from_slice(&row[div_col..]);
            out
        };
        for row in self.eq.iter_mut() {
            widen1(row);
        }
        for row in self.ineq.iter_mut() {
            widen1(row);
        }
        for div in self.divs.iter_mut() {
            widen1(&mut div.row);
        }
        for row in &other.eq {
            self.eq.push(widen2(row));
        }
        for row in &other.ineq {
            self.ineq.push(widen2(row));
        }
        for div in &other.divs {
            self.divs.push(Div {
                denom: div.denom.clone(),
                row: widen2(&div.row),
            });
        }
        self.space.n_div = nd1 + nd2;
        if !other.is_rational() {
            self.flags.clear(Flags::RATIONAL);
        }
        self.clear_derived_flags();
        Ok(self.simplify())
    }

    /// Existentially project out one column by exact Fourier-Motzkin:
    /// use an equality when one involves the column, otherwise combine
    /// every (lower, upper) bound pair.  The column itself is kept (and
    /// is zero everywhere afterwards).
    fn eliminate_col(&mut self, col: usize) {
        debug_assert!(
            self.divs.iter().all(|d| d.row[col].is_zero()),
            "eliminated column appears in a division definition"
        );
        if let Some(k) = self.eq.iter().position(|row| !row[col].is_zero()) {
            let pivot = self.eq.remove(k);
            for row in self.eq.iter_mut() {
                if !row[col].is_zero() {
                    seq::elim(row, &pivot, col);
                }
            }
            for row in self.ineq.iter_mut() {
                if !row[col].is_zero() {
                    seq::elim(row, &pivot, col);
                }
            }
            return;
        }
        let mut lower: SmallVec<[usize; 8]> = SmallVec::new();
        let mut upper: SmallVec<[usize; 8]> = SmallVec::new();
        for (i, row) in self.ineq.iter().enumerate() {
            if row[col].is_positive() {
                lower.push(i);
            } else if row[col].is_negative() {
                upper.push(i);
            }
        }
        let mut out: Vec<Constraint> = Vec::new();
        for row in &self.ineq {
            if row[col].is_zero() {
                out.push(row.clone());
            }
        }
        for &l in &lower {
            for &u in &upper {
                let mut row = self.ineq[l].clone();
                seq::elim(&mut row, &self.ineq[u], col);
                seq::normalize(&mut row);
                out.push(row);
            }
        }
        self.ineq = out;
    }

    /// Fourier-Motzkin elimination of `n` set dimensions starting at
    /// `first`; the columns are kept in place.
    pub fn eliminate_dims(mut self, first: usize, n: usize) -> Result<Self> {
        if first + n > self.space.n_out {
            return Err(Error::DimRange);
        }
        if self.is_empty_flagged() || n == 0 {
            return Ok(self);
        }
        let base = self.space.dim_col() + first;
        for col in (base..base + n).rev() {
            self.eliminate_col(col);
        }
        self.clear_derived_flags();
        Ok(self.simplify())
    }

    /// Project out `n` set dimensions starting at `first` and drop their
    /// columns.
    pub fn remove_dims(mut self, first: usize, n: usize) -> Result<Self> {
        let empty = self.is_empty_flagged();
        if !empty {
            self = self.eliminate_dims(first, n)?;
        }
        let base = self.space.dim_col() + first;
        for row in self.eq.iter_mut() {
            row.drain(base..base + n);
        }
        for row in self.ineq.iter_mut() {
            row.drain(base..base + n);
        }
        for div in self.divs.iter_mut() {
            div.row.drain(base..base + n);
        }
        self.space.n_out -= n;
        Ok(self)
    }

    /// Project out all divisions and drop their columns.
    pub fn remove_divs(mut self) -> Self {
        if self.space.n_div == 0 {
            return self;
        }
        let base = self.space.div_col();
        let n = self.space.n_div;
        self.divs.clear();
        if !self.is_empty_flagged() {
            for col in (base..base + n).rev() {
                self.eliminate_col(col);
            }
        }
        for row in self.eq.iter_mut() {
            row.drain(base..base + n);
        }
        for row in self.ineq.iter_mut() {
            row.drain(base..base + n);
        }
        self.space.n_div = 0;
        self.clear_derived_flags();
        if self.is_empty_flagged() {
            return self;
        }
        self.simplify()
    }

    /// True when every point of `self` satisfies every constraint of
    /// `other` (rational relaxation).
    pub fn is_subset(&self, other: &BasicSet) -> Result<bool> {
        use crate::tab::{solve_lp, LpResult};

        if self.space.total() != other.space.total() {
            return Err(Error::SpaceMismatch);
        }
        if self.is_empty_flagged() {
            return Ok(true);
        }
        let mut rows: Vec<Constraint> = other.ineq.clone();
        for eq in &other.eq {
            rows.push(eq.clone());
            let mut neg = eq.clone();
            seq::neg(&mut neg);
            rows.push(neg);
        }
        for row in &rows {
            match solve_lp(self, false, row, &BigInt::from(1))? {
                LpResult::Empty => return Ok(true),
                LpResult::Unbounded => return Ok(false),
                LpResult::Optimal { num, .. } => {
                    if num.is_negative() {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    pub fn is_equal(&self, other: &BasicSet) -> Result<bool> {
        Ok(self.is_subset(other)? && other.is_subset(self)?)
    }

    /// Emptiness of the rational relaxation.
    pub fn is_empty(&self) -> Result<bool> {
        use crate::tab::{solve_lp, LpResult};

        if self.is_empty_flagged() {
            return Ok(true);
        }
        let zero = vec![BigInt::zero(); 1 + self.space.total()];
        Ok(matches!(
            solve_lp(self, false, &zero, &BigInt::from(1))?,
            LpResult::Empty
        ))
    }
}

enum Dedup {
    Done,
    Promoted,
    Empty,
}

/// Hash key of a coefficient slice up to sign: the slice and its
/// negation map to the same key, so opposite orientations land in the
/// same bucket.
pub(crate) fn canonical_key(coeffs: &[BigInt]) -> u64 {
    match seq::first_non_zero(coeffs) {
        None => seq::hash_key(coeffs),
        Some(p) if !coeffs[p].is_negative() => seq::hash_key(coeffs),
        Some(_) => {
            let mut neg: Vec<BigInt> = coeffs.to_vec();
            seq::neg(&mut neg);
            seq::hash_key(&neg)
        }
    }
}
