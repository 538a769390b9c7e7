//! Engine-agnostic integer primitives for polyhedral computations.
//!
//! This crate exposes the shared arithmetic layer used by the set library:
//! - exact integer sequence operations (`seq`)
//! - dense integer matrices with homogeneous right inverses (`mat`)
//!
//! All arithmetic is exact; there is no floating point anywhere.

pub mod mat;
pub mod seq;

pub use mat::Mat;
