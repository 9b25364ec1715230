use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::element::ElementProperties;
use crate::error::{CoreError, ModelError};
use crate::material::Material;

/// A scalar output a model contributes at a point (a node, an integration
/// point, or the element centroid) for post-processing.
#[derive(Debug, Clone)]
pub struct NamedOutput {
    pub name: String,
    pub value: f64,
}

/// Names and sizing a model is built around: its equation/unknown pairs, the
/// element-local term buffer sizes it wants, and whether it shares a single
/// explicit-term buffer across ring slots instead of copying it every step.
#[derive(Debug, Clone)]
pub struct ModelProperties {
    pub equation_names: Vec<String>,
    pub unknown_names: Vec<String>,
    pub property_count: usize,
    pub merge_explicit_terms: bool,
}

impl ModelProperties {
    pub fn equations_per_node(&self) -> usize {
        self.equation_names.len()
    }
}

/// Everything a [`Model`] needs to evaluate one element at one point in the
/// Newton/time-stepping loop. Built fresh by the assembler for every call so
/// a model can never retain a stale reference across calls.
pub struct ElementCtx<'a> {
    pub element_id: u64,
    pub node_coords: &'a [[f64; 3]],
    pub material: &'a Material,
    pub t: f64,
    pub dt: f64,
    pub unknowns_current: &'a [f64],
    pub unknowns_previous: &'a [f64],
    pub implicit_current: &'a mut [f64],
    pub implicit_previous: &'a [f64],
    pub explicit_current: &'a mut [f64],
    pub explicit_previous: &'a [f64],
    pub constant: &'a mut [f64],
}

/// A load applied over a named region, sampled by
/// [`Model::compute_loads`].
#[derive(Debug, Clone)]
pub struct Load {
    pub name: String,
    pub magnitude: f64,
}

/// A request for a named scalar at a given local point index (node or
/// integration-point ordinal), answered by [`Model::compute_outputs`].
#[derive(Debug, Clone, Copy)]
pub struct OutputPoint {
    pub local_index: usize,
}

/// The physics contract every coupled PDE implements. Mirrors the fixed
/// entry-point table the driver calls in order: properties are declared once,
/// then each element is visited for initial state, explicit terms, implicit
/// terms, matrix, residual, loads and outputs, in that order, every Newton
/// iteration that needs them.
pub trait Model: Send + Sync {
    fn name(&self) -> &str;

    fn properties(&self) -> &ModelProperties;

    fn read_material_properties(&self, material: &mut Material, raw: &HashMap<String, f64>) -> Result<(), ModelError>;

    fn print_model_char(&self) -> String {
        format!("model: {}", self.name())
    }

    fn define_element_properties(&self, properties: &mut ElementProperties);

    fn compute_initial_state(&self, ctx: &mut ElementCtx) -> Result<(), ModelError>;

    fn compute_explicit_terms(&self, ctx: &mut ElementCtx) -> Result<(), ModelError>;

    fn compute_implicit_terms(&self, ctx: &mut ElementCtx) -> Result<(), ModelError>;

    fn compute_matrix(&self, ctx: &ElementCtx) -> Result<DMatrix<f64>, ModelError>;

    fn compute_residu(&self, ctx: &ElementCtx) -> Result<DVector<f64>, ModelError>;

    fn compute_loads(&self, ctx: &ElementCtx, load: &Load) -> Result<DVector<f64>, ModelError>;

    fn compute_outputs(&self, ctx: &ElementCtx, point: &OutputPoint) -> Vec<NamedOutput>;
}

/// Every model available to a problem, looked up by name during mesh
/// numbering and assembly.
#[derive(Default, Clone)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: Arc<dyn Model>) {
        self.models.insert(model.name().to_string(), model);
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn Model>, CoreError> {
        self.models.get(name).ok_or_else(|| CoreError::ModelNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}
