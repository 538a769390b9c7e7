//! Exact operations on integer sequences (constraint rows, directions).
//!
//! A constraint row is a slice of `BigInt` with the constant term in
//! position 0; every helper here works on plain slices so the callers can
//! hand over whole rows or coefficient tails as needed.

use std::hash::{Hash, Hasher};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

/// Position of the first non-zero entry, if any.
#[inline]
pub fn first_non_zero(s: &[BigInt]) -> Option<usize> {
    s.iter().position(|v| !v.is_zero())
}

#[inline]
pub fn is_zero(s: &[BigInt]) -> bool {
    s.iter().all(Zero::is_zero)
}

/// Elementwise `a == -b`.
pub fn is_neg(a: &[BigInt], b: &[BigInt]) -> bool {
    debug_assert_eq!(a.len(), b.len(), "sequence length mismatch");
    a.iter().zip(b.iter()).all(|(x, y)| {
        if x.is_zero() {
            y.is_zero()
        } else {
            *x == -y
        }
    })
}

pub fn neg(s: &mut [BigInt]) {
    for v in s.iter_mut() {
        if !v.is_zero() {
            let t = std::mem::take(v);
            *v = -t;
        }
    }
}

pub fn scale(s: &mut [BigInt], f: &BigInt) {
    if f.is_zero() {
        for v in s.iter_mut() {
            v.set_zero();
        }
        return;
    }
    for v in s.iter_mut() {
        if !v.is_zero() {
            let t = std::mem::take(v);
            *v = t * f;
        }
    }
}

/// `dst = f1*dst + f2*src`.
pub fn combine(dst: &mut [BigInt], f1: &BigInt, f2: &BigInt, src: &[BigInt]) {
    debug_assert_eq!(dst.len(), src.len(), "sequence length mismatch");
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        let t = std::mem::take(d);
        *d = t * f1 + s * f2;
    }
}

/// The content of the sequence: the gcd of all entries (non-negative,
/// zero for an all-zero sequence).
pub fn content(s: &[BigInt]) -> BigInt {
    use num_traits::One;
    let mut g = BigInt::zero();
    for v in s {
        if v.is_zero() {
            continue;
        }
        g = g.gcd(v);
        if g.is_one() {
            break;
        }
    }
    g
}

/// Divide the sequence by its content, if larger than one.
pub fn normalize(s: &mut [BigInt]) {
    use num_traits::One;
    let g = content(s);
    if g.is_zero() || g.is_one() {
        return;
    }
    for v in s.iter_mut() {
        if !v.is_zero() {
            let t = std::mem::take(v);
            *v = t / &g;
        }
    }
}

/// Eliminate `dst[pos]` against `src` (which must be non-zero there),
/// combining with exact integer multipliers.  The multiplier applied to
/// `dst` is kept positive, so an inequality row stays an inequality of
/// the same orientation when `src` is an equality.
pub fn elim(dst: &mut [BigInt], src: &[BigInt], pos: usize) {
    debug_assert!(!src[pos].is_zero(), "elimination pivot is zero");
    if dst[pos].is_zero() {
        return;
    }
    let g = src[pos].gcd(&dst[pos]);
    let mut a = &src[pos] / &g;
    let mut b = &dst[pos] / &g;
    if a.is_negative() {
        a = -a;
        b = -b;
    }
    let nb = -b;
    combine(dst, &a, &nb, src);
    debug_assert!(dst[pos].is_zero(), "elimination left a residue");
}

/// A 64-bit key of a coefficient slice, used by the constraint hash
/// tables.  Rows that agree on every coefficient hash equal.
pub fn hash_key(coeffs: &[BigInt]) -> u64 {
    let mut h = ahash::AHasher::default();
    for v in coeffs {
        v.hash(&mut h);
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(v: &[i64]) -> Vec<BigInt> {
        v.iter().map(|&x| BigInt::from(x)).collect()
    }

    #[test]
    fn elim_cancels_position_and_keeps_orientation() {
        let src = row(&[0, 2, 1]);
        let mut dst = row(&[3, 4, -5]);
        elim(&mut dst, &src, 1);
        assert!(dst[1].is_zero());
        // dst = 1*dst - 2*src => (3, 0, -7)
        assert_eq!(dst, row(&[3, 0, -7]));

        // Negative pivot in src must not flip dst's orientation.
        let src = row(&[0, -2, 1]);
        let mut dst = row(&[3, 4, -5]);
        elim(&mut dst, &src, 1);
        assert_eq!(dst, row(&[3, 0, -3]));
    }

    #[test]
    fn normalize_divides_by_content() {
        let mut s = row(&[6, -9, 3]);
        normalize(&mut s);
        assert_eq!(s, row(&[2, -3, 1]));

        let mut z = row(&[0, 0]);
        normalize(&mut z);
        assert_eq!(z, row(&[0, 0]));
    }

    #[test]
    fn negation_test_handles_zero_entries() {
        assert!(is_neg(&row(&[0, 2, -3]), &row(&[0, -2, 3])));
        assert!(!is_neg(&row(&[0, 2, -3]), &row(&[0, -2, -3])));
    }

    #[test]
    fn hash_key_ignores_nothing_but_value() {
        assert_eq!(hash_key(&row(&[1, -2])), hash_key(&row(&[1, -2])));
        assert_ne!(hash_key(&row(&[1, -2])), hash_key(&row(&[-1, 2])));
    }
}
