//! Relational siblings of sets and the bridging used by the hull engine.
//!
//! A basic map is a basic set whose dimensions carry an input/output
//! split.  For hull purposes a map is flattened to its underlying set:
//! the parameters, inputs, outputs and divisions all become plain set
//! dimensions (after the divisions have been aligned across the parts),
//! and the model part's space is re-imposed on the result afterwards.

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::basic::Div;
use crate::{BasicSet, Constraint, Error, Result, Set, Space};

/// A single conjunction of constraints over an input/output space.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BasicMap {
    pub(crate) base: BasicSet,
}

/// A finite union of basic maps.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Map {
    pub(crate) base: Set,
}

impl BasicMap {
    pub fn universe(space: Space) -> Self {
        Self {
            base: BasicSet::universe(space),
        }
    }

    pub fn empty(space: Space) -> Self {
        Self {
            base: BasicSet::empty(Space { n_div: 0, ..space }),
        }
    }

    pub fn from_rows(space: Space, eqs: &[&[i64]], ineqs: &[&[i64]]) -> Result<Self> {
        Ok(Self {
            base: BasicSet::from_rows(space, eqs, ineqs)?,
        })
    }

    #[inline]
    pub fn space(&self) -> &Space {
        self.base.space()
    }

    #[inline]
    pub fn basic_set(&self) -> &BasicSet {
        &self.base
    }

    pub fn into_basic_set(self) -> Result<BasicSet> {
        if !self.base.space().is_set() {
            return Err(Error::SpaceMismatch);
        }
        Ok(self.base)
    }

    pub fn from_basic_set(bset: BasicSet) -> Self {
        Self { base: bset }
    }

    pub fn is_empty_flagged(&self) -> bool {
        self.base.is_empty_flagged()
    }

    pub fn simplify(self) -> Self {
        Self {
            base: self.base.simplify(),
        }
    }
}

impl Map {
    pub fn empty(space: Space) -> Self {
        Self {
            base: Set::empty(space),
        }
    }

    pub fn from_basic_map(bmap: BasicMap) -> Self {
        Self {
            base: Set::from_basic_set(bmap.base),
        }
    }

    pub fn add_basic_map(self, bmap: BasicMap) -> Result<Self> {
        Ok(Self {
            base: self.base.add_basic_set(bmap.base)?,
        })
    }

    pub fn from_set(set: Set) -> Self {
        Self { base: set }
    }

    pub fn into_set(self) -> Result<Set> {
        if !self.base.space().is_set() {
            return Err(Error::SpaceMismatch);
        }
        Ok(self.base)
    }

    #[inline]
    pub fn space(&self) -> &Space {
        self.base.space()
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.base.n()
    }

    #[inline]
    pub fn parts(&self) -> &[BasicSet] {
        self.base.parts()
    }

    /// Expand every part to the union of the parts' division definitions,
    /// so that all parts share one div layout.  A division introduced
    /// into a part that lacked it brings its two defining inequalities
    /// along.  Definitions that reference other divisions cannot be
    /// aligned.
    pub fn align_divs(mut self) -> Result<Self> {
        if self.base.parts.iter().all(|p| p.space().n_div == 0) {
            return Ok(self);
        }

        // Collect the distinct definitions, keyed on the denominator and
        // the non-division prefix of the defining row.
        let mut defs: Vec<(BigInt, Constraint)> = Vec::new();
        for part in &self.base.parts {
            let div_col = part.space().div_col();
            for div in part.divs() {
                if div.row[div_col..].iter().any(|v| !v.is_zero()) {
                    return Err(Error::Invariant(
                        "division definition references another division",
                    ));
                }
                let prefix = div.row[..div_col].to_vec();
                if !defs
                    .iter()
                    .any(|(m, p)| *m == div.denom && *p == prefix)
                {
                    defs.push((div.denom.clone(), prefix));
                }
            }
        }

        let mut parts = Vec::with_capacity(self.base.parts.len());
        for part in self.base.parts.drain(..) {
            parts.push(align_part(part, &defs)?);
        }
        self.base.parts = parts;
        Ok(self)
    }

    /// Forget the relational structure: every column becomes a plain set
    /// dimension of an anonymous space.  The parts must already share
    /// one div layout.
    pub fn underlying_set(self) -> Result<Set> {
        let mut n_div = None;
        for p in self.base.parts.iter() {
            let nd = p.space().n_div;
            if *n_div.get_or_insert(nd) != nd {
                return Err(Error::Invariant("underlying set of unaligned divisions"));
            }
        }
        let space = *self.base.space();
        let total =
            space.n_param + space.n_in + space.n_out + n_div.unwrap_or(0);
        let mut parts = Vec::with_capacity(self.base.parts.len());
        for p in self.base.parts {
            parts.push(underlying_basic_set(p));
        }
        Ok(Set {
            space: Space::underlying(total),
            parts,
        })
    }
}

fn align_part(part: BasicSet, defs: &[(BigInt, Constraint)]) -> Result<BasicSet> {
    let space = *part.space();
    let div_col = space.div_col();
    let n_new = defs.len();

    // Where each existing division lands in the aligned layout.
    let mut mapping: Vec<usize> = Vec::with_capacity(part.divs().len());
    for div in part.divs() {
        let prefix = &div.row[..div_col];
        let pos = defs
            .iter()
            .position(|(m, p)| *m == div.denom && p.as_slice() == prefix)
            .ok_or(Error::Invariant("division definition lost during alignment"))?;
        mapping.push(pos);
    }

    let new_space = Space {
        n_div: n_new,
        ..space
    };
    let remap = |row: &Constraint| -> Constraint {
        let mut out = vec![BigInt::zero(); 1 + new_space.total()];
        out[..div_col].clone_from_slice(&row[..div_col]);
        for (old, &new) in mapping.iter().enumerate() {
            if !row[div_col + old].is_zero() {
                out[div_col + new] = row[div_col + old].clone();
            }
        }
        out
    };

    let mut out = BasicSet::universe(new_space);
    out.flags = part.flags;
    for row in part.eqs() {
        out.eq.push(remap(row));
    }
    for row in part.ineqs() {
        out.ineq.push(remap(row));
    }
    for (i, (denom, prefix)) in defs.iter().enumerate() {
        let mut row = vec![BigInt::zero(); 1 + new_space.total()];
        row[..div_col].clone_from_slice(prefix);
        out.divs.push(Div {
            denom: denom.clone(),
            row,
        });
        if mapping.contains(&i) {
            continue;
        }
        // A freshly introduced division q = floor(e / m) also needs
        // m q <= e <= m q + m - 1 to constrain its column.
        let mut lower = vec![BigInt::zero(); 1 + new_space.total()];
        lower[..div_col].clone_from_slice(prefix);
        lower[div_col + i] = -denom.clone();
        let mut upper: Constraint = lower.iter().map(|v| -v.clone()).collect();
        upper[0] += denom - BigInt::one();
        out.ineq.push(lower);
        out.ineq.push(upper);
    }
    Ok(out)
}

fn underlying_basic_set(part: BasicSet) -> BasicSet {
    let total = part.space().total();
    BasicSet {
        space: Space::underlying(total),
        eq: part.eq,
        ineq: part.ineq,
        divs: Vec::new(),
        flags: part.flags,
    }
}

/// Re-impose a model's space and divisions on a pure basic set, the
/// inverse of [`Map::underlying_set`] on a single part.
pub fn overlying_set(bset: BasicSet, model: &BasicMap) -> Result<BasicMap> {
    let model_total = model.base.space().total();
    if bset.total() != model_total {
        return Err(Error::SpaceMismatch);
    }
    let mut out = bset;
    out.space = *model.base.space();
    out.divs = model.base.divs.clone();
    Ok(BasicMap { base: out })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underlying_set_flattens_everything() {
        // One parameter, one input, one output.
        let space = Space {
            n_param: 1,
            n_in: 1,
            n_out: 1,
            n_div: 0,
        };
        let bmap = BasicMap::from_rows(space, &[&[0, 0, 1, -1]], &[&[0, 1, 0, 0]]).unwrap();
        let set = Map::from_basic_map(bmap).underlying_set().unwrap();
        assert_eq!(set.space().n_dim(), 3);
        assert_eq!(set.parts()[0].n_eq(), 1);
    }

    #[test]
    fn align_divs_introduces_missing_definitions() {
        // Part A has q = floor(x / 2); part B has no divisions.
        let space_a = Space {
            n_param: 0,
            n_in: 0,
            n_out: 1,
            n_div: 1,
        };
        let mut a = BasicSet::from_rows(space_a, &[], &[&[0, 1, -2], &[1, -1, 2]]).unwrap();
        a.divs.push(Div {
            denom: BigInt::from(2),
            row: crate::basic::row_from_i64(&[0, 1, 0]),
        });
        let b = BasicSet::from_rows(Space::set_space(0, 1), &[], &[&[0, 1], &[7, -1]]).unwrap();

        let map = Map::from_basic_map(BasicMap::from_basic_set(a))
            .add_basic_map(BasicMap::from_basic_set(b))
            .unwrap()
            .align_divs()
            .unwrap();
        for p in map.parts() {
            assert_eq!(p.space().n_div, 1);
            assert_eq!(p.divs().len(), 1);
        }
        // The second part gained the defining pair.
        assert_eq!(map.parts()[1].n_ineq(), 4);
    }
}
