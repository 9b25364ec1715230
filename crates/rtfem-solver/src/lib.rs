//! The coupled nonlinear transient solver: the Driver's date/repetition/Newton
//! loop, the Assembler, the SolutionRing, and the pluggable sparse linear
//! backends behind a uniform factor-and-solve interface.

pub mod assembler;
pub mod backend;
pub mod boundary;
pub mod dates;
pub mod driver;
pub mod error;
pub mod iteration;
pub mod models;
pub mod options;
pub mod problem;
pub mod ring;
pub mod solution;
pub mod sparse_matrix;

pub use assembler::Assembler;
pub use backend::{backend_by_name, default_backend, BackendError, LinearBackend, SolveInfo, SparseTripletsF64};
pub use boundary::{BoundaryConditions, DirichletBC, LoadEntry, Loads};
pub use dates::{Dates, Objectives, TimeStepController};
pub use driver::{Driver, DriverStatus};
pub use error::EngineError;
pub use iteration::{IterationController, IterationOutcome};
pub use models::DiffusionModel;
pub use options::Options;
pub use problem::{InitialCondition, Problem};
pub use ring::SolutionRing;
pub use solution::{Solution, TermBuffer};
pub use sparse_matrix::SparseMatrix;
