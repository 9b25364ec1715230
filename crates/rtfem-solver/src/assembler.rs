use nalgebra::DVector;
use rayon::prelude::*;

use rtfem_core::{ElementCtx, Mesh, INACTIVE};

use crate::boundary::Loads;
use crate::error::EngineError;
use crate::solution::TermBuffer;
use crate::sparse_matrix::SparseMatrix;

/// Scatters per-element residual and tangent contributions into the global
/// system. Assembly order is irrelevant: scatter-add is commutative, so the
/// element loop may run in parallel when `parallel` is set.
pub struct Assembler {
    pub parallel: bool,
}

impl Default for Assembler {
    fn default() -> Self {
        Self { parallel: false }
    }
}

impl Assembler {
    /// Computes `implicit terms` for every element at `(t, dt)`. Any element
    /// failure aborts the whole assembly with that element's error.
    pub fn compute_implicit_terms(
        &self,
        mesh: &Mesh,
        ring: &mut crate::ring::SolutionRing,
        t: f64,
        dt: f64,
        iteration: u32,
    ) -> Result<(), EngineError> {
        let explicit = ring.explicit_terms().to_vec();
        let prev_unknowns = ring.previous().unknowns.clone();
        let cur = ring.current_mut();
        for (idx, element) in mesh.elements().iter().enumerate() {
            let model = mesh.models.get(&element.model_name)?;
            let node_coords: Vec<[f64; 3]> =
                element.nodes.iter().map(|&id| mesh.node(id).expect("checked at numbering").coords).collect();
            let material =
                mesh.materials.material_for_element(element.id).expect("every element must have a material");

            let local_unknowns_current = local_slice(element, &cur.unknowns);
            let local_unknowns_previous = local_slice(element, &prev_unknowns);

            let mut explicit_current = explicit[idx].as_slice().to_vec();
            let mut ctx = ElementCtx {
                element_id: element.id,
                node_coords: &node_coords,
                material,
                t,
                dt,
                unknowns_current: &local_unknowns_current,
                unknowns_previous: &local_unknowns_previous,
                implicit_current: cur.implicit[idx].as_mut_slice(),
                implicit_previous: &[],
                explicit_current: &mut explicit_current,
                explicit_previous: &[],
                constant: cur.constant[idx].as_mut_slice(),
            };
            model
                .compute_implicit_terms(&mut ctx)
                .map_err(|source| EngineError::ImplicitTerms { element: element.id, iteration, source })?;
        }
        Ok(())
    }

    /// Computes explicit terms from the `previous` solution only.
    pub fn compute_explicit_terms(
        &self,
        mesh: &Mesh,
        ring: &mut crate::ring::SolutionRing,
        t: f64,
    ) -> Result<(), EngineError> {
        let prev = ring.previous().clone();
        let explicit = ring.explicit_terms_mut();
        for (idx, element) in mesh.elements().iter().enumerate() {
            let model = mesh.models.get(&element.model_name)?;
            let node_coords: Vec<[f64; 3]> =
                element.nodes.iter().map(|&id| mesh.node(id).expect("checked at numbering").coords).collect();
            let material =
                mesh.materials.material_for_element(element.id).expect("every element must have a material");
            let local_unknowns_previous = local_slice(element, &prev.unknowns);
            let mut scratch_implicit = vec![0.0; prev.implicit[idx].len()];
            let mut scratch_constant = vec![0.0; prev.constant[idx].len()];

            let mut ctx = ElementCtx {
                element_id: element.id,
                node_coords: &node_coords,
                material,
                t,
                dt: 0.0,
                unknowns_current: &local_unknowns_previous,
                unknowns_previous: &local_unknowns_previous,
                implicit_current: &mut scratch_implicit,
                implicit_previous: prev.implicit[idx].as_slice(),
                explicit_current: explicit[idx].as_mut_slice(),
                explicit_previous: &[],
                constant: &mut scratch_constant,
            };
            model
                .compute_explicit_terms(&mut ctx)
                .map_err(|source| EngineError::ExplicitTerms { element: element.id, source })?;
        }
        Ok(())
    }

    /// Assembles the global tangent matrix and the residual + load RHS.
    /// Returns `residual` (so the Newton loop can check `-residual` for the
    /// solve and for convergence) and writes the tangent into `matrix`.
    pub fn assemble(
        &self,
        mesh: &Mesh,
        ring: &crate::ring::SolutionRing,
        matrix: &mut SparseMatrix,
        loads: &Loads,
        sets: &rtfem_core::Sets,
        t: f64,
        dt: f64,
        iteration: u32,
    ) -> Result<DVector<f64>, EngineError> {
        matrix.zero_values();
        let mut residual = DVector::zeros(matrix.nrows);
        let cur = ring.current();
        let prev = ring.previous();
        let explicit = ring.explicit_terms();

        let contexts: Vec<_> = mesh.elements().iter().enumerate().collect();
        let blocks: Result<Vec<_>, EngineError> = if self.parallel {
            contexts
                .par_iter()
                .map(|&(idx, element)| self.element_block(mesh, element, idx, cur, prev, explicit, t, dt, iteration))
                .collect()
        } else {
            contexts
                .iter()
                .map(|&(idx, element)| self.element_block(mesh, element, idx, cur, prev, explicit, t, dt, iteration))
                .collect()
        };

        for (element, tangent, residu) in blocks? {
            matrix.scatter_add(element, &tangent);
            for i in 0..element.local_dof_count() {
                let (row, _) = element.dof_map.get(i);
                if row != INACTIVE {
                    residual[row as usize] += residu[i];
                }
            }
        }

        for (element, load) in loads.applicable(mesh, sets) {
            let model = mesh.models.get(&element.model_name)?;
            let node_coords: Vec<[f64; 3]> =
                element.nodes.iter().map(|&id| mesh.node(id).expect("checked").coords).collect();
            let material = mesh.materials.material_for_element(element.id).expect("material required");
            let idx = mesh.elements().iter().position(|e| e.id == element.id).unwrap();
            let local_unknowns = local_slice(element, &cur.unknowns);
            let local_unknowns_previous = local_slice(element, &prev.unknowns);
            let mut constant_scratch = cur.constant[idx].as_slice().to_vec();
            let ctx = ElementCtx {
                element_id: element.id,
                node_coords: &node_coords,
                material,
                t,
                dt,
                unknowns_current: &local_unknowns,
                unknowns_previous: &local_unknowns_previous,
                implicit_current: &mut [],
                implicit_previous: cur.implicit[idx].as_slice(),
                explicit_current: &mut [],
                explicit_previous: explicit[idx].as_slice(),
                constant: &mut constant_scratch,
            };
            let block = model
                .compute_loads(&ctx, load)
                .map_err(|source| EngineError::Matrix { element: element.id, iteration, source })?;
            for i in 0..element.local_dof_count() {
                let (row, _) = element.dof_map.get(i);
                if row != INACTIVE {
                    residual[row as usize] += block[i];
                }
            }
        }

        Ok(residual)
    }

    #[allow(clippy::too_many_arguments)]
    fn element_block<'a>(
        &self,
        mesh: &'a Mesh,
        element: &'a rtfem_core::Element,
        idx: usize,
        cur: &crate::solution::Solution,
        prev: &crate::solution::Solution,
        explicit: &[TermBuffer],
        t: f64,
        dt: f64,
        iteration: u32,
    ) -> Result<(&'a rtfem_core::Element, nalgebra::DMatrix<f64>, DVector<f64>), EngineError> {
        let model = mesh.models.get(&element.model_name)?;
        let node_coords: Vec<[f64; 3]> =
            element.nodes.iter().map(|&id| mesh.node(id).expect("checked at numbering").coords).collect();
        let material = mesh.materials.material_for_element(element.id).expect("every element must have a material");
        let local_unknowns = local_slice(element, &cur.unknowns);
        let local_unknowns_previous = local_slice(element, &prev.unknowns);
        let mut constant_scratch = cur.constant[idx].as_slice().to_vec();

        let ctx = ElementCtx {
            element_id: element.id,
            node_coords: &node_coords,
            material,
            t,
            dt,
            unknowns_current: &local_unknowns,
            unknowns_previous: &local_unknowns_previous,
            implicit_current: &mut [],
            implicit_previous: cur.implicit[idx].as_slice(),
            explicit_current: &mut [],
            explicit_previous: explicit[idx].as_slice(),
            constant: &mut constant_scratch,
        };

        let tangent = model
            .compute_matrix(&ctx)
            .map_err(|source| EngineError::Matrix { element: element.id, iteration, source })?;
        let residu = model
            .compute_residu(&ctx)
            .map_err(|source| EngineError::Matrix { element: element.id, iteration, source })?;
        Ok((element, tangent, residu))
    }
}

fn local_slice(element: &rtfem_core::Element, global: &DVector<f64>) -> Vec<f64> {
    (0..element.local_dof_count())
        .map(|i| {
            let (_, col) = element.dof_map.get(i);
            if col == INACTIVE {
                0.0
            } else {
                global[col as usize]
            }
        })
        .collect()
}
