use log::{info, warn};

use rtfem_core::ElementCtx;

use crate::assembler::Assembler;
use crate::error::EngineError;
use crate::iteration::IterationOutcome;
use crate::problem::Problem;
use crate::ring::SolutionRing;
use crate::sparse_matrix::SparseMatrix;
use crate::LinearBackend;

/// Terminal state of a run, reported by [`Driver::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum DriverStatus {
    ConvergedAllDates,
    StoppedAtDate(usize),
    Aborted(String),
}

/// Runs the nested date / repetition / Newton loop described by the engine's
/// component design: advance through every date interval, adapting `dt` and
/// retrying with a smaller one when a step fails, until every date is
/// reached or the repetition budget is exhausted.
pub struct Driver<'a> {
    pub problem: &'a Problem,
    pub backend: Box<dyn LinearBackend>,
    pub assembler: Assembler,
}

impl<'a> Driver<'a> {
    pub fn new(problem: &'a Problem, backend: Box<dyn LinearBackend>) -> Self {
        Self { problem, backend, assembler: Assembler::default() }
    }

    /// Builds a fresh ring, applies initial conditions, and runs every
    /// element's `compute_initial_state` once.
    pub fn initialize(&self) -> Result<SolutionRing, EngineError> {
        let mesh = &self.problem.mesh;
        let sizes = self.problem.element_term_sizes();
        let merge = self.problem.merges_explicit_terms();
        let mut ring = SolutionRing::new(self.problem.ring_size, mesh.num_dofs(), &sizes, merge);

        self.problem.apply_initial_conditions(&mut ring.current_mut().unknowns);

        for (idx, element) in mesh.elements().iter().enumerate() {
            let model = mesh.models.get(&element.model_name)?;
            let node_coords: Vec<[f64; 3]> =
                element.nodes.iter().map(|&id| mesh.node(id).expect("checked at numbering").coords).collect();
            let material = mesh.materials.material_for_element(element.id).expect("material required");
            let cur = ring.current_mut();
            let local_unknowns = cur.unknowns.as_slice().to_vec();
            let mut explicit_scratch = vec![0.0; cur.explicit.get(idx).map(|b| b.len()).unwrap_or(0)];
            let mut ctx = ElementCtx {
                element_id: element.id,
                node_coords: &node_coords,
                material,
                t: 0.0,
                dt: 0.0,
                unknowns_current: &local_unknowns,
                unknowns_previous: &local_unknowns,
                implicit_current: cur.implicit[idx].as_mut_slice(),
                implicit_previous: &[],
                explicit_current: &mut explicit_scratch,
                explicit_previous: &[],
                constant: cur.constant[idx].as_mut_slice(),
            };
            model.compute_initial_state(&mut ctx).map_err(|source| EngineError::ExplicitTerms {
                element: element.id,
                source,
            })?;
            if !ring.merges_explicit_terms() {
                ring.current_mut().explicit[idx].as_mut_slice().copy_from_slice(&explicit_scratch);
            } else {
                ring.explicit_terms_mut()[idx].as_mut_slice().copy_from_slice(&explicit_scratch);
            }
        }
        Ok(ring)
    }

    /// Runs from `ring`'s current state through every remaining date.
    pub fn run(&self, ring: &mut SolutionRing, start_idate: usize) -> DriverStatus {
        let mesh = &self.problem.mesh;
        let dates = &self.problem.dates;
        let mut matrix = SparseMatrix::from_mesh(mesh);

        let mut dt = self.problem.time_step.dt_ini;
        let mut last_ratio = self.problem.time_step.target_ratio;

        for idate in start_idate..dates.len().saturating_sub(1) {
            let date_end = dates.get(idate + 1);

            while ring.current().t < date_end {
                ring.step_forward();

                if let Err(e) = self.assembler.compute_explicit_terms(mesh, ring, ring.current().t) {
                    ring.step_backward();
                    warn!("undefined explicit terms: {e}");
                    return DriverStatus::Aborted(e.to_string());
                }

                dt = self.problem.time_step.next_dt(dt, last_ratio, ring.current().t, date_end);
                let mut accepted = false;

                for _rep in 0..=self.problem.iteration.max_repetitions {
                    let t_trial = ring.previous().t + dt;
                    self.problem.boundary_conditions.install(
                        mesh,
                        &self.problem.sets,
                        t_trial,
                        &mut ring.current_mut().unknowns,
                    );

                    let prev_unknowns = ring.previous().unknowns.clone();
                    match self.newton_loop(mesh, ring, &mut matrix, t_trial, dt) {
                        Ok(()) => {
                            ring.current_mut().t = t_trial;
                            let delta = &ring.current().unknowns - &prev_unknowns;
                            last_ratio = self.problem.iteration.error_metric(&delta, &self.problem.objectives);
                            accepted = true;
                            break;
                        }
                        Err(e) => {
                            warn!("step rejected at dt={dt}: {e}");
                            dt = self.problem.time_step.reduce(dt);
                        }
                    }
                }

                if !accepted {
                    ring.step_backward();
                    return DriverStatus::Aborted(format!("repetition budget exhausted at date index {idate}"));
                }

                info!("accepted step to t={}", ring.current().t);
            }

            info!("date {idate} reached at t={}", ring.current().t);
        }

        DriverStatus::ConvergedAllDates
    }

    fn newton_loop(
        &self,
        mesh: &rtfem_core::Mesh,
        ring: &mut SolutionRing,
        matrix: &mut SparseMatrix,
        t: f64,
        dt: f64,
    ) -> Result<(), EngineError> {
        for n in 0..self.problem.iteration.max_iterations {
            self.assembler.compute_implicit_terms(mesh, ring, t, dt, n)?;

            let mut residual =
                self.assembler.assemble(mesh, ring, matrix, &self.problem.loads, &self.problem.sets, t, dt, n)?;

            for row in self.problem.boundary_conditions.dirichlet_rows(mesh, &self.problem.sets) {
                matrix.clamp_row(row);
                residual[row] = 0.0;
            }

            let triplets = matrix.to_triplets();
            let neg_residual = -residual;
            let (increment, _info) = self
                .backend
                .factor_and_solve(&triplets, &neg_residual, false)
                .map_err(|source| EngineError::LinearSolve { iteration: n, source })?;

            ring.current_mut().unknowns += &increment;

            let err = self.problem.iteration.error_metric(&increment, &self.problem.objectives);
            match self.problem.iteration.classify(err, n) {
                IterationOutcome::Converged => return Ok(()),
                IterationOutcome::Continue => continue,
                IterationOutcome::Diverged => {
                    return Err(EngineError::Fatal(format!("Newton loop diverged at iteration {n}, err={err}")));
                }
            }
        }
        Err(EngineError::Fatal("Newton loop exceeded iteration budget".to_string()))
    }
}
