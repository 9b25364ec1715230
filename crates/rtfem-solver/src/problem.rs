use nalgebra::DVector;
use rtfem_core::{Mesh, Sets};

use crate::boundary::{BoundaryConditions, Loads};
use crate::dates::{Dates, TimeStepController};
use crate::iteration::IterationController;
use crate::options::Options;

/// A flat initial value for one named equation over a node set, applied at
/// the start of a run before `compute_initial_state` runs.
#[derive(Debug, Clone)]
pub struct InitialCondition {
    pub node_set: String,
    pub equation_name: String,
    pub value: f64,
}

/// Everything the Driver needs to run: mesh, regions, boundary conditions,
/// loads, initial conditions, the date sequence, and the controllers/options
/// that parameterize the loops.
pub struct Problem {
    pub mesh: Mesh,
    pub sets: Sets,
    pub boundary_conditions: BoundaryConditions,
    pub loads: Loads,
    pub initial_conditions: Vec<InitialCondition>,
    pub dates: Dates,
    pub objectives: Vec<f64>,
    pub time_step: TimeStepController,
    pub iteration: IterationController,
    pub options: Options,
    pub ring_size: usize,
}

impl Problem {
    /// Writes every initial condition's value into `unknowns`, indexed by
    /// each affected node's global column for that equation. Called by the
    /// Driver once the ring's first slot exists, before `compute_initial_state`.
    pub fn apply_initial_conditions(&self, unknowns: &mut DVector<f64>) {
        for ic in &self.initial_conditions {
            let Some(nodes) = self.sets.nodes(&ic.node_set) else { continue };
            for &node_id in nodes {
                if let Some((_, col)) = self.mesh.dof_for(node_id, &ic.equation_name)
                    && col >= 0
                {
                    unknowns[col as usize] = ic.value;
                }
            }
        }
    }

    /// Per-element `(implicit, explicit, constant)` term buffer sizes, in
    /// element order, used to size every `Solution` in the ring.
    pub fn element_term_sizes(&self) -> Vec<(usize, usize, usize)> {
        self.mesh
            .elements()
            .iter()
            .map(|e| (e.properties.implicit_terms, e.properties.explicit_terms, e.properties.constant_terms))
            .collect()
    }

    /// Whether every registered model requests a shared explicit-term
    /// backing array. Implemented ring-wide rather than per-model: a mixed
    /// mesh where only some models merge falls back to per-slot copies.
    pub fn merges_explicit_terms(&self) -> bool {
        self.mesh.models.names().all(|name| {
            self.mesh.models.get(name).map(|m| m.properties().merge_explicit_terms).unwrap_or(false)
        })
    }
}
