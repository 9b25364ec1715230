//! Linear backend abstraction layer.
//!
//! The Assembler produces a backend-neutral [`SparseMatrix`](crate::sparse_matrix::SparseMatrix)
//! + RHS vector; a [`LinearBackend`] translates that into its own native
//! layout and factors it. Three variants are selectable by name (`-solver`
//! on the CLI):
//!
//! - **dense-lu**: pure nalgebra, partial-pivoted dense LU. Always available.
//! - **supernodal-csc**: builds a compressed-sparse-column matrix first.
//! - **multifrontal-blas**: factors through `nalgebra-lapack` (BLAS/LAPACK).

pub mod dense;
pub mod multifrontal;
pub mod supernodal;
pub mod traits;

pub use dense::DenseLuBackend;
pub use multifrontal::MultifrontalBackend;
pub use supernodal::SupernodalBackend;
pub use traits::*;

pub fn default_backend() -> Box<dyn LinearBackend> {
    Box::new(DenseLuBackend)
}

/// Looks up a backend by its `-solver` name.
pub fn backend_by_name(name: &str) -> Result<Box<dyn LinearBackend>, String> {
    match name {
        "dense-lu" | "crout" => Ok(Box::new(DenseLuBackend)),
        "supernodal-csc" | "superlu" => Ok(Box::new(SupernodalBackend)),
        "multifrontal-blas" | "ma38" => Ok(Box::new(MultifrontalBackend::default())),
        other => Err(format!("unknown solver backend '{other}'")),
    }
}
