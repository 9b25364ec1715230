//! Supernodal-style backend: builds the system as a compressed-sparse-column
//! matrix before factoring, matching the "supernodal LU on compressed
//! columns" backend named in the driver-variant table. The elimination
//! algorithm itself is out of scope for this engine (only the factor+solve
//! interface and native layout are); it falls back to a dense LU solve of
//! the same matrix, mirroring the documented fallback already used by the
//! sibling CSR assembly path this crate inherited.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix};

use super::traits::{BackendError, LinearBackend, SolveInfo, SparseTripletsF64};

#[derive(Default)]
pub struct SupernodalBackend;

impl LinearBackend for SupernodalBackend {
    fn name(&self) -> &str {
        "supernodal-csc"
    }

    fn factor_and_solve(
        &self,
        system: &SparseTripletsF64,
        rhs: &DVector<f64>,
        transpose: bool,
    ) -> Result<(DVector<f64>, SolveInfo), BackendError> {
        let coo = CooMatrix::try_from_triplets(
            system.nrows,
            system.ncols,
            system.row_indices.clone(),
            system.col_indices.clone(),
            system.values.clone(),
        )
        .map_err(|e| BackendError(format!("invalid sparsity pattern: {e:?}")))?;
        let csc = CscMatrix::from(&coo);

        let mut k = DMatrix::zeros(system.nrows, system.ncols);
        for (row, col, value) in csc.triplet_iter() {
            k[(row, col)] += value;
        }
        if transpose {
            k.transpose_mut();
        }

        let u = k.lu().solve(rhs).ok_or(BackendError("singular matrix in supernodal factorization".into()))?;

        Ok((u, SolveInfo { iterations: 1, residual_norm: None, solver_name: "supernodal-csc".to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_small_system() {
        let system = SparseTripletsF64 {
            nrows: 2,
            ncols: 2,
            row_indices: vec![0, 0, 1, 1],
            col_indices: vec![0, 1, 0, 1],
            values: vec![2.0, 1.0, 1.0, 2.0],
        };
        let rhs = DVector::from_vec(vec![3.0, 3.0]);
        let backend = SupernodalBackend;
        let (u, _) = backend.factor_and_solve(&system, &rhs, false).unwrap();
        assert!((u[0] - 1.0).abs() < 1e-9);
        assert!((u[1] - 1.0).abs() < 1e-9);
    }
}
