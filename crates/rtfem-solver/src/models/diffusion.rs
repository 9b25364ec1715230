use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use rtfem_core::{ElementCtx, Load, Material, Model, ModelError, ModelProperties, NamedOutput, OutputPoint};

/// A two-node linear diffusion (conduction) element: one scalar unknown per
/// node, tangent `K = (k/L)[[1,-1],[-1,1]]`, optional lumped capacity for
/// transient runs.
///
/// Material properties: `[0]` conductivity `k`, `[1]` capacity `c` (0 for a
/// steady-state material). The element's length is computed once from node
/// coordinates and cached in its constant-term buffer.
pub struct DiffusionModel {
    properties: ModelProperties,
}

impl DiffusionModel {
    pub fn new() -> Self {
        Self {
            properties: ModelProperties {
                equation_names: vec!["temperature".to_string()],
                unknown_names: vec!["temperature".to_string()],
                property_count: 2,
                merge_explicit_terms: false,
            },
        }
    }
}

impl Default for DiffusionModel {
    fn default() -> Self {
        Self::new()
    }
}

fn length(ctx: &ElementCtx) -> f64 {
    let a = ctx.node_coords[0];
    let b = ctx.node_coords[1];
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2) + (b[2] - a[2]).powi(2)).sqrt()
}

fn stiffness(k: f64, l: f64) -> DMatrix<f64> {
    let kl = k / l;
    DMatrix::from_row_slice(2, 2, &[kl, -kl, -kl, kl])
}

impl Model for DiffusionModel {
    fn name(&self) -> &str {
        "diffusion"
    }

    fn properties(&self) -> &ModelProperties {
        &self.properties
    }

    fn read_material_properties(&self, material: &mut Material, raw: &HashMap<String, f64>) -> Result<(), ModelError> {
        let conductivity = raw.get("conductivity").copied().ok_or_else(|| ModelError::InvalidProperty {
            model: self.name().to_string(),
            property: "conductivity".to_string(),
            reason: "required material property is missing".to_string(),
        })?;
        material.set_property(0, conductivity);
        material.set_property(1, raw.get("capacity").copied().unwrap_or(0.0));
        Ok(())
    }

    fn define_element_properties(&self, properties: &mut rtfem_core::ElementProperties) {
        properties.implicit_terms = 0;
        properties.explicit_terms = 0;
        properties.constant_terms = 1;
    }

    fn compute_initial_state(&self, ctx: &mut ElementCtx) -> Result<(), ModelError> {
        ctx.constant[0] = length(ctx);
        Ok(())
    }

    fn compute_explicit_terms(&self, _ctx: &mut ElementCtx) -> Result<(), ModelError> {
        Ok(())
    }

    fn compute_implicit_terms(&self, _ctx: &mut ElementCtx) -> Result<(), ModelError> {
        Ok(())
    }

    fn compute_matrix(&self, ctx: &ElementCtx) -> Result<DMatrix<f64>, ModelError> {
        let l = ctx.constant[0];
        let k = ctx.material.property(0);
        let c = ctx.material.property(1);
        let mut m = stiffness(k, l);
        if c > 0.0 && ctx.dt > 0.0 {
            let capacity = c * l / ctx.dt;
            m[(0, 0)] += capacity / 2.0;
            m[(1, 1)] += capacity / 2.0;
        }
        Ok(m)
    }

    fn compute_residu(&self, ctx: &ElementCtx) -> Result<DVector<f64>, ModelError> {
        let l = ctx.constant[0];
        let k = ctx.material.property(0);
        let c = ctx.material.property(1);
        let u = DVector::from_row_slice(ctx.unknowns_current);
        let mut r = stiffness(k, l) * &u;
        if c > 0.0 && ctx.dt > 0.0 {
            let u_prev = DVector::from_row_slice(ctx.unknowns_previous);
            let capacity = c * l / ctx.dt / 2.0;
            r[0] += capacity * (u[0] - u_prev[0]);
            r[1] += capacity * (u[1] - u_prev[1]);
        }
        Ok(r)
    }

    fn compute_loads(&self, ctx: &ElementCtx, load: &Load) -> Result<DVector<f64>, ModelError> {
        let _ = ctx;
        Ok(DVector::from_row_slice(&[load.magnitude / 2.0, load.magnitude / 2.0]))
    }

    fn compute_outputs(&self, ctx: &ElementCtx, point: &OutputPoint) -> Vec<NamedOutput> {
        vec![NamedOutput {
            name: "temperature".to_string(),
            value: ctx.unknowns_current[point.local_index],
        }]
    }
}
