//! Dense integer matrices.
//!
//! These matrices represent homogeneous linear transformations between
//! constraint spaces: a row is a vector over `1 + d` columns with the
//! homogeneous coordinate first.  Because constraints are invariant under
//! positive scaling, the "inverses" computed here are exact up to a
//! positive diagonal and never require rational entries.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::seq;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Mat {
    n_row: usize,
    n_col: usize,
    data: Vec<BigInt>,
}

impl Mat {
    pub fn zero(n_row: usize, n_col: usize) -> Self {
        Self {
            n_row,
            n_col,
            data: vec![BigInt::zero(); n_row * n_col],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zero(n, n);
        for i in 0..n {
            m.data[i * n + i] = BigInt::one();
        }
        m
    }

    pub fn from_rows(rows: &[&[BigInt]], n_col: usize) -> Self {
        let mut m = Self::zero(rows.len(), n_col);
        for (i, r) in rows.iter().enumerate() {
            assert_eq!(r.len(), n_col, "row width mismatch");
            m.row_mut(i).clone_from_slice(r);
        }
        m
    }

    #[inline]
    pub fn n_row(&self) -> usize {
        self.n_row
    }

    #[inline]
    pub fn n_col(&self) -> usize {
        self.n_col
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[BigInt] {
        &self.data[i * self.n_col..(i + 1) * self.n_col]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [BigInt] {
        &mut self.data[i * self.n_col..(i + 1) * self.n_col]
    }

    #[inline]
    pub fn at(&self, i: usize, j: usize) -> &BigInt {
        &self.data[i * self.n_col + j]
    }

    pub fn set(&mut self, i: usize, j: usize, v: BigInt) {
        self.data[i * self.n_col + j] = v;
    }

    fn swap_cols(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for i in 0..self.n_row {
            self.data.swap(i * self.n_col + a, i * self.n_col + b);
        }
    }

    /// `self * other`.
    pub fn product(&self, other: &Mat) -> Mat {
        assert_eq!(self.n_col, other.n_row, "product dimension mismatch");
        let mut out = Mat::zero(self.n_row, other.n_col);
        for i in 0..self.n_row {
            for k in 0..self.n_col {
                let a = self.at(i, k);
                if a.is_zero() {
                    continue;
                }
                for j in 0..other.n_col {
                    let b = other.at(k, j);
                    if b.is_zero() {
                        continue;
                    }
                    let t = std::mem::take(&mut out.data[i * other.n_col + j]);
                    out.data[i * other.n_col + j] = t + a * b;
                }
            }
        }
        out
    }

    /// Apply `self` to a row vector: `v * self`.
    pub fn apply_to_row(&self, v: &[BigInt]) -> Vec<BigInt> {
        assert_eq!(v.len(), self.n_row, "row application dimension mismatch");
        let mut out = vec![BigInt::zero(); self.n_col];
        for (k, a) in v.iter().enumerate() {
            if a.is_zero() {
                continue;
            }
            for j in 0..self.n_col {
                let b = self.at(k, j);
                if b.is_zero() {
                    continue;
                }
                let t = std::mem::take(&mut out[j]);
                out[j] = t + a * b;
            }
        }
        out
    }

    pub fn drop_rows(mut self, first: usize, n: usize) -> Mat {
        assert!(first + n <= self.n_row, "row drop out of range");
        self.data.drain(first * self.n_col..(first + n) * self.n_col);
        self.n_row -= n;
        self
    }

    pub fn drop_cols(self, first: usize, n: usize) -> Mat {
        assert!(first + n <= self.n_col, "column drop out of range");
        let n_col = self.n_col - n;
        let mut out = Mat::zero(self.n_row, n_col);
        for i in 0..self.n_row {
            let src = self.row(i);
            let dst = out.row_mut(i);
            dst[..first].clone_from_slice(&src[..first]);
            dst[first..].clone_from_slice(&src[first + n..]);
        }
        out
    }

    /// For a matrix `M` of full row rank, an `n x n` integer matrix `U`
    /// with `M * U = d * [I | 0]` for a single positive integer `d`.
    ///
    /// Used for homogeneous changes of coordinates `x = U z`: when the
    /// first row of `M` is `(1, 0, ..., 0)`, the first row of `U` is
    /// `(d, 0, ..., 0)` and constraint rows transform by `c * U` without
    /// ever dividing out the denominator.  The denominator must be the
    /// same for every row of `M`, since callers combine rows of `M`
    /// using coefficients read off in the transformed space.
    ///
    /// Returns `None` when a pivot cannot be found, i.e. when the rows
    /// are linearly dependent.
    pub fn right_inverse(&self) -> Option<Mat> {
        let (m, n) = (self.n_row, self.n_col);
        let mut e = self.clone();
        let mut u = Mat::identity(n);

        for i in 0..m {
            let pivot = (i..n).find(|&j| !e.at(i, j).is_zero())?;
            e.swap_cols(i, pivot);
            u.swap_cols(i, pivot);

            for k in 0..n {
                if k == i || e.at(i, k).is_zero() {
                    continue;
                }
                let g = e.at(i, i).gcd(e.at(i, k));
                let mut a = e.at(i, i) / &g;
                let mut b = e.at(i, k) / &g;
                if a.is_negative() {
                    a = -a;
                    b = -b;
                }
                for r in 0..m {
                    let t = &e.data[r * n + k] * &a - &e.data[r * n + i] * &b;
                    e.data[r * n + k] = t;
                }
                for r in 0..n {
                    let t = &u.data[r * n + k] * &a - &u.data[r * n + i] * &b;
                    u.data[r * n + k] = t;
                }
            }

            if e.at(i, i).is_negative() {
                for r in 0..m {
                    let t = -std::mem::take(&mut e.data[r * n + i]);
                    e.data[r * n + i] = t;
                }
                for r in 0..n {
                    let t = -std::mem::take(&mut u.data[r * n + i]);
                    u.data[r * n + i] = t;
                }
            }

            // Keep the entries small: a column of U may be divided by its
            // content as long as the matching column of E follows.
            let mut col: Vec<BigInt> = (0..n).map(|r| u.at(r, i).clone()).collect();
            let g = seq::content(&col);
            if !g.is_zero() && !g.is_one() {
                for v in col.iter_mut() {
                    if !v.is_zero() {
                        let t = std::mem::take(v);
                        *v = t / &g;
                    }
                }
                for (r, v) in col.into_iter().enumerate() {
                    u.data[r * n + i] = v;
                }
                for r in 0..m {
                    if !e.at(r, i).is_zero() {
                        let t = std::mem::take(&mut e.data[r * n + i]);
                        e.data[r * n + i] = t / &g;
                    }
                }
            }
        }

        // Bring every pivot to the common denominator lcm(d_0..d_{m-1}).
        let mut l = BigInt::one();
        for i in 0..m {
            l = l.lcm(e.at(i, i));
        }
        for i in 0..m {
            let f = &l / e.at(i, i);
            if f.is_one() {
                continue;
            }
            for r in 0..n {
                if !u.at(r, i).is_zero() {
                    let t = std::mem::take(&mut u.data[r * n + i]);
                    u.data[r * n + i] = t * &f;
                }
            }
        }
        Some(u)
    }

    /// An integer basis of `{ w : M * w = 0 }`, one vector per row of the
    /// result.  The basis vectors are content-normalized.
    pub fn kernel(&self) -> Mat {
        let (m, n) = (self.n_row, self.n_col);
        let mut e = self.clone();

        // Fraction-free reduction to a form where every pivot column is
        // zero outside its pivot row.
        let mut pivots: Vec<(usize, usize)> = Vec::new();
        let mut row = 0;
        for col in 0..n {
            let found = (row..m).find(|&r| !e.at(r, col).is_zero());
            let Some(r) = found else { continue };
            for k in 0..n {
                e.data.swap(row * n + k, r * n + k);
            }
            for r2 in 0..m {
                if r2 == row || e.at(r2, col).is_zero() {
                    continue;
                }
                let (dst, src): (&mut [BigInt], &[BigInt]) = if r2 < row {
                    let (a, b) = e.data.split_at_mut(row * n);
                    (&mut a[r2 * n..(r2 + 1) * n], &b[..n])
                } else {
                    let (a, b) = e.data.split_at_mut(r2 * n);
                    (&mut b[..n], &a[row * n..(row + 1) * n])
                };
                seq::elim(dst, src, col);
            }
            pivots.push((row, col));
            row += 1;
            if row == m {
                break;
            }
        }

        let pivot_cols: Vec<usize> = pivots.iter().map(|&(_, c)| c).collect();
        let free_cols: Vec<usize> = (0..n).filter(|c| !pivot_cols.contains(c)).collect();

        let mut l = BigInt::one();
        for &(r, c) in &pivots {
            l = l.lcm(e.at(r, c));
        }

        let mut out = Mat::zero(free_cols.len(), n);
        for (i, &f) in free_cols.iter().enumerate() {
            out.set(i, f, l.clone());
            for &(r, c) in &pivots {
                if e.at(r, f).is_zero() {
                    continue;
                }
                let v = -(e.at(r, f) * &l) / e.at(r, c);
                out.set(i, c, v);
            }
            seq::normalize(out.row_mut(i));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat(rows: &[&[i64]]) -> Mat {
        let n_col = rows[0].len();
        let big: Vec<Vec<BigInt>> = rows
            .iter()
            .map(|r| r.iter().map(|&x| BigInt::from(x)).collect())
            .collect();
        let refs: Vec<&[BigInt]> = big.iter().map(|r| r.as_slice()).collect();
        Mat::from_rows(&refs, n_col)
    }

    fn is_scaled_unit_block(p: &Mat, m: usize) {
        for i in 0..m {
            for j in 0..p.n_col() {
                if i == j {
                    assert!(p.at(i, j).is_positive(), "diagonal not positive at {i}");
                    assert_eq!(p.at(i, j), p.at(0, 0), "diagonal not uniform at {i}");
                } else {
                    assert!(p.at(i, j).is_zero(), "off-diagonal residue at ({i},{j})");
                }
            }
        }
    }

    #[test]
    fn right_inverse_of_homogeneous_transform() {
        let m = mat(&[&[1, 0, 0, 0], &[-3, 1, 2, 0], &[5, 0, 1, -1]]);
        let u = m.right_inverse().expect("full row rank");
        assert_eq!(u.n_row(), 4);
        assert_eq!(u.n_col(), 4);
        let p = m.product(&u);
        is_scaled_unit_block(&p, 3);
        // First row stays pinned to the homogeneous coordinate.
        assert!(u.at(0, 0).is_positive());
        for j in 1..4 {
            assert!(u.at(0, j).is_zero());
        }
    }

    #[test]
    fn right_inverse_detects_dependent_rows() {
        let m = mat(&[&[1, 0, 0], &[0, 2, 4], &[0, 1, 2]]);
        assert!(m.right_inverse().is_none());
    }

    #[test]
    fn product_and_drops() {
        let a = mat(&[&[1, 2], &[3, 4]]);
        let b = mat(&[&[0, 1], &[1, 0]]);
        assert_eq!(a.product(&b), mat(&[&[2, 1], &[4, 3]]));

        let c = mat(&[&[1, 2, 3], &[4, 5, 6], &[7, 8, 9]]);
        assert_eq!(c.clone().drop_rows(1, 1), mat(&[&[1, 2, 3], &[7, 8, 9]]));
        assert_eq!(c.drop_cols(0, 1), mat(&[&[2, 3], &[5, 6], &[8, 9]]));
    }

    #[test]
    fn kernel_vectors_annihilate() {
        let m = mat(&[&[1, 1, -1, 0], &[0, 2, 0, -2]]);
        let k = m.kernel();
        assert_eq!(k.n_row(), 2);
        for i in 0..k.n_row() {
            let w = k.row(i);
            for r in 0..m.n_row() {
                let dot: BigInt = m.row(r).iter().zip(w.iter()).map(|(a, b)| a * b).sum();
                assert!(dot.is_zero(), "kernel vector does not annihilate row {r}");
            }
        }
    }
}
