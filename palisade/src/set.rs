//! Sets: finite unions of basic sets.

use palisade_core::mat::Mat;

use crate::tab::Tab;
use crate::{BasicSet, Constraint, Error, Result, Space};

/// An ordered union of basic sets over one space.  No parts means the
/// empty set.  The parts may carry different divisions; the set-level
/// space never counts divisions.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Set {
    pub(crate) space: Space,
    pub(crate) parts: Vec<BasicSet>,
}

impl Set {
    pub fn empty(space: Space) -> Self {
        Self {
            space: Space { n_div: 0, ..space },
            parts: Vec::new(),
        }
    }

    pub fn from_basic_set(bset: BasicSet) -> Self {
        let space = Space {
            n_div: 0,
            ..*bset.space()
        };
        Self {
            space,
            parts: vec![bset],
        }
    }

    pub fn add_basic_set(mut self, bset: BasicSet) -> Result<Self> {
        if !self.space.compatible(bset.space()) {
            return Err(Error::SpaceMismatch);
        }
        self.parts.push(bset);
        Ok(self)
    }

    #[inline]
    pub fn space(&self) -> &Space {
        &self.space
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn parts(&self) -> &[BasicSet] {
        &self.parts
    }

    #[inline]
    pub fn into_parts(self) -> Vec<BasicSet> {
        self.parts
    }

    pub fn set_rational(mut self) -> Self {
        self.parts = self.parts.into_iter().map(BasicSet::set_rational).collect();
        self
    }

    pub fn remove_empty_parts(mut self) -> Self {
        self.parts.retain(|p| !p.is_empty_flagged());
        self
    }

    /// Simplify every part and drop the ones that turn out empty.
    pub fn normalize(mut self) -> Self {
        self.parts = self
            .parts
            .into_iter()
            .map(BasicSet::simplify)
            .filter(|p| !p.is_empty_flagged())
            .collect();
        self
    }

    /// Substitute `x = T z` in every part.
    pub fn preimage(self, t: &Mat) -> Result<Self> {
        let mut parts = Vec::with_capacity(self.parts.len());
        for p in self.parts {
            let p = p.preimage(t)?;
            if !p.is_empty_flagged() {
                parts.push(p);
            }
        }
        let space = Space::underlying(t.n_col() - 1);
        Ok(Self { space, parts })
    }

    pub fn eliminate_dims(self, first: usize, n: usize) -> Result<Self> {
        let space = self.space;
        let mut parts = Vec::with_capacity(self.parts.len());
        for p in self.parts {
            let p = p.eliminate_dims(first, n)?;
            if !p.is_empty_flagged() {
                parts.push(p);
            }
        }
        Ok(Self { space, parts })
    }

    pub fn remove_divs(mut self) -> Self {
        self.parts = self
            .parts
            .into_iter()
            .map(BasicSet::remove_divs)
            .filter(|p| !p.is_empty_flagged())
            .collect();
        self
    }

    /// Conjoin one equality onto every part.
    pub(crate) fn add_equality_to_parts(mut self, row: &Constraint) -> Result<Self> {
        let mut parts = Vec::with_capacity(self.parts.len());
        for p in self.parts.drain(..) {
            parts.push(p.add_equality(row.clone())?);
        }
        self.parts = parts;
        Ok(self)
    }

    /// Every part's recession cone degenerates to the origin.
    pub fn is_bounded(&self) -> Result<bool> {
        for p in &self.parts {
            if p.is_empty_flagged() {
                continue;
            }
            if !Tab::from_recession_cone(p).cone_is_bounded()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Every part is contained in `other` (rational relaxation).
    pub fn is_subset(&self, other: &BasicSet) -> Result<bool> {
        for p in &self.parts {
            if !p.is_subset(other)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
