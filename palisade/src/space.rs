/// Dimension layout of a (basic) set or map.
///
/// Constraint rows are integer vectors of length `1 + total()` with the
/// constant term in column 0, followed by the parameters, the input
/// dimensions, the output (or set) dimensions and the integer divisions,
/// in that order.  A set is a map without input dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Space {
    pub n_param: usize,
    pub n_in: usize,
    pub n_out: usize,
    pub n_div: usize,
}

impl Space {
    pub fn set_space(n_param: usize, n_dim: usize) -> Self {
        Self {
            n_param,
            n_in: 0,
            n_out: n_dim,
            n_div: 0,
        }
    }

    pub fn map_space(n_param: usize, n_in: usize, n_out: usize) -> Self {
        Self {
            n_param,
            n_in,
            n_out,
            n_div: 0,
        }
    }

    /// The anonymous space underlying a map: every column reinterpreted
    /// as a plain set dimension.
    pub fn underlying(total: usize) -> Self {
        Self::set_space(0, total)
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.n_param + self.n_in + self.n_out + self.n_div
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.n_in == 0
    }

    /// Number of set dimensions; meaningful for set spaces only.
    #[inline]
    pub fn n_dim(&self) -> usize {
        debug_assert!(self.is_set(), "n_dim on a map space");
        self.n_out
    }

    /// Column of the first set/output dimension within a constraint row.
    #[inline]
    pub fn dim_col(&self) -> usize {
        1 + self.n_param + self.n_in
    }

    /// Column of the first division within a constraint row.
    #[inline]
    pub fn div_col(&self) -> usize {
        1 + self.n_param + self.n_in + self.n_out
    }

    /// Same layout apart from the divisions.
    #[inline]
    pub fn compatible(&self, other: &Space) -> bool {
        self.n_param == other.n_param && self.n_in == other.n_in && self.n_out == other.n_out
    }
}
