use thiserror::Error;

/// Errors surfaced by the set library.
///
/// `Unbounded` and `Empty` outcomes of linear programs are not errors;
/// they are ordinary [`LpResult`](crate::tab::LpResult) values that the
/// algorithms interpret.  Everything here aborts the enclosing
/// computation and propagates to the public API boundary unchanged.
#[derive(Debug, Error)]
pub enum PalisadeError {
    #[error("operands live in incompatible spaces")]
    SpaceMismatch,
    #[error("dimension index out of range")]
    DimRange,
    #[error("matrix is singular where full row rank is required")]
    SingularMatrix,
    #[error("linear program solver failed")]
    Lp,
    #[error("invariant violated: {0}")]
    Invariant(&'static str),
}
