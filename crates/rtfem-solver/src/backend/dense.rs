//! Dense LU backend: the default, always-available solver. Reconstructs a
//! full dense matrix from the triplet set and factors it with partial
//! pivoting.

use nalgebra::{DMatrix, DVector};

use super::traits::{BackendError, LinearBackend, SolveInfo, SparseTripletsF64};

#[derive(Default)]
pub struct DenseLuBackend;

impl LinearBackend for DenseLuBackend {
    fn name(&self) -> &str {
        "dense-lu"
    }

    fn factor_and_solve(
        &self,
        system: &SparseTripletsF64,
        rhs: &DVector<f64>,
        transpose: bool,
    ) -> Result<(DVector<f64>, SolveInfo), BackendError> {
        let mut k = DMatrix::zeros(system.nrows, system.ncols);
        for i in 0..system.nnz() {
            k[(system.row_indices[i], system.col_indices[i])] += system.values[i];
        }
        if transpose {
            k.transpose_mut();
        }

        let u = k.lu().solve(rhs).ok_or(BackendError("singular matrix in dense LU decomposition".into()))?;

        Ok((u, SolveInfo { iterations: 1, residual_norm: None, solver_name: "dense-lu".to_string() }))
    }
}
