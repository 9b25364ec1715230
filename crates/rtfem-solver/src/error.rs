use thiserror::Error;

use rtfem_core::{CoreError, ModelError};

use crate::backend::BackendError;

/// The engine-wide error type threaded with `?` through the Driver, Assembler
/// and LinearBackend. `Fatal` is the only variant that is allowed to
/// short-circuit a whole run; every other variant is caught at a step
/// boundary and turned into a dt reduction instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("undefined explicit terms at element {element}: {source}")]
    ExplicitTerms { element: u64, source: ModelError },
    #[error("undefined implicit terms at iteration {iteration}, element {element}: {source}")]
    ImplicitTerms { element: u64, iteration: u32, source: ModelError },
    #[error("undefined matrix at iteration {iteration}, element {element}: {source}")]
    Matrix { element: u64, iteration: u32, source: ModelError },
    #[error("unable to solve at iteration {iteration}: {source}")]
    LinearSolve { iteration: u32, source: BackendError },
    #[error("model/mesh inconsistency: {0}")]
    Core(#[from] CoreError),
    #[error("budget exhausted: {0}")]
    BudgetExhausted(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Whether the Driver should retry this step with a reduced `dt` rather
    /// than abort the whole run.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Fatal(_) | EngineError::Core(_))
    }
}
