use nalgebra::DVector;

/// Error type for backend operations: singular factor, out-of-memory,
/// numerical breakdown are all reported through this uniform type.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        BackendError(s)
    }
}

impl From<&str> for BackendError {
    fn from(s: &str) -> Self {
        BackendError(s.to_string())
    }
}

/// A sparse matrix in coordinate (triplet) form, the backend-neutral
/// interchange format between [`crate::sparse_matrix::SparseMatrix`] and any
/// [`LinearBackend`].
pub struct SparseTripletsF64 {
    pub nrows: usize,
    pub ncols: usize,
    pub row_indices: Vec<usize>,
    pub col_indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseTripletsF64 {
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

/// Solver convergence and diagnostic info.
pub struct SolveInfo {
    pub iterations: usize,
    pub residual_norm: Option<f64>,
    pub solver_name: String,
}

/// A pluggable factor+solve strategy. The internal elimination algorithm is
/// not part of this contract; only the translation from triplets to the
/// backend's native layout and the factor/solve entry point are.
pub trait LinearBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Accepts `fill factor` hints (multifrontal-style backends use this to
    /// size working storage); backends that don't use fill-reducing
    /// reordering ignore it.
    fn set_fill_factor(&mut self, _fill_factor: f64) {}

    fn factor_and_solve(
        &self,
        system: &SparseTripletsF64,
        rhs: &DVector<f64>,
        transpose: bool,
    ) -> Result<(DVector<f64>, SolveInfo), BackendError>;
}
