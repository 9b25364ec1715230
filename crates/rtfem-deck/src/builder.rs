//! Turns a mesh/problem description — built up programmatically or read
//! from a [`Deck`] — into the [`Problem`] the Driver runs.
//!
//! [`ProblemBuilder`] is the fully-specified path: every field has an
//! explicit setter. [`apply_deck`] is a thin convenience layer on top that
//! recognizes a small set of cards and ignores the rest with a logged
//! warning, since covering every card an Abaqus/CalculiX deck can contain is
//! out of scope here.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use rtfem_core::{Curve, Element, ElementSet, Load, Material, Mesh, Model, Node, NodeSet, Sets};
use rtfem_solver::{
    BoundaryConditions, DirichletBC, InitialCondition, IterationController, Loads, Options, Problem,
    TimeStepController,
};

use crate::card::{Card, Deck};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("deck line {line}: {message}")]
    Deck { line: usize, message: String },
    #[error(transparent)]
    Core(#[from] rtfem_core::CoreError),
}

fn param<'a>(card: &'a Card, key: &str) -> Option<&'a str> {
    card.parameters.iter().find(|p| p.key == key).and_then(|p| p.value.as_deref())
}

fn required_param<'a>(card: &'a Card, key: &str) -> Result<&'a str, BuildError> {
    param(card, key).ok_or_else(|| BuildError::Deck {
        line: card.line_start,
        message: format!("*{} requires {key}=...", card.keyword),
    })
}

fn parse_f64(raw: &str, line: usize) -> Result<f64, BuildError> {
    raw.trim().parse().map_err(|_| BuildError::Deck { line, message: format!("'{raw}' is not a number") })
}

fn split_fields(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Assembles a [`Problem`] field by field. The primary, fully-specified
/// construction path; [`apply_deck`] is a convenience layer on top of it.
pub struct ProblemBuilder {
    mesh: Mesh,
    sets: Sets,
    boundary_conditions: BoundaryConditions,
    loads: Loads,
    initial_conditions: Vec<InitialCondition>,
    dates: Vec<f64>,
    objectives: Vec<f64>,
    time_step: TimeStepController,
    iteration: IterationController,
    options: Options,
    ring_size: usize,
}

impl Default for ProblemBuilder {
    fn default() -> Self {
        Self {
            mesh: Mesh::new(),
            sets: Sets::new(),
            boundary_conditions: BoundaryConditions::new(),
            loads: Loads::new(),
            initial_conditions: Vec::new(),
            dates: Vec::new(),
            objectives: Vec::new(),
            time_step: TimeStepController::default(),
            iteration: IterationController::default(),
            options: Options::default(),
            ring_size: 2,
        }
    }
}

impl ProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_model(&mut self, model: Arc<dyn Model>) -> &mut Self {
        self.mesh.models.register(model);
        self
    }

    pub fn add_node(&mut self, id: u64, coords: [f64; 3]) -> &mut Self {
        self.mesh.add_node(Node::new(id, coords));
        self
    }

    /// Adds an element whose local DOF map is sized from `model_name`'s
    /// registered equations-per-node; fails if the model isn't registered.
    pub fn add_element(
        &mut self,
        id: u64,
        nodes: Vec<u64>,
        model_name: &str,
        material_name: &str,
    ) -> Result<&mut Self, BuildError> {
        let equations_per_node = self.mesh.models.get(model_name)?.properties().equations_per_node();
        let element = Element::new(id, nodes, model_name, material_name, equations_per_node);
        self.mesh.materials.assign(id, material_name);
        self.mesh.add_element(element);
        Ok(self)
    }

    pub fn add_material(&mut self, material: Material) -> &mut Self {
        self.mesh.materials.add_material(material);
        self
    }

    pub fn add_node_set(&mut self, set: NodeSet) -> &mut Self {
        self.sets.add_node_set(set);
        self
    }

    pub fn add_element_set(&mut self, set: ElementSet) -> &mut Self {
        self.sets.add_element_set(set);
        self
    }

    pub fn add_initial_condition(&mut self, ic: InitialCondition) -> &mut Self {
        self.initial_conditions.push(ic);
        self
    }

    pub fn add_boundary_condition(&mut self, bc: DirichletBC) -> &mut Self {
        self.boundary_conditions.add(bc);
        self
    }

    pub fn add_load(&mut self, element_set: impl Into<String>, load: Load) -> &mut Self {
        self.loads.add(element_set, load);
        self
    }

    pub fn set_dates(&mut self, dates: Vec<f64>) -> &mut Self {
        self.dates = dates;
        self
    }

    pub fn set_objectives(&mut self, objectives: Vec<f64>) -> &mut Self {
        self.objectives = objectives;
        self
    }

    pub fn set_time_step(&mut self, time_step: TimeStepController) -> &mut Self {
        self.time_step = time_step;
        self
    }

    pub fn set_iteration(&mut self, iteration: IterationController) -> &mut Self {
        self.iteration = iteration;
        self
    }

    pub fn set_options(&mut self, options: Options) -> &mut Self {
        self.options = options;
        self
    }

    pub fn set_ring_size(&mut self, ring_size: usize) -> &mut Self {
        self.ring_size = ring_size;
        self
    }

    /// Numbers the mesh and produces the finished [`Problem`].
    pub fn build(mut self) -> Result<Problem, BuildError> {
        self.mesh.assign_dofs()?;
        Ok(Problem {
            mesh: self.mesh,
            sets: self.sets,
            boundary_conditions: self.boundary_conditions,
            loads: self.loads,
            initial_conditions: self.initial_conditions,
            dates: rtfem_solver::Dates::new(self.dates),
            objectives: self.objectives,
            time_step: self.time_step,
            iteration: self.iteration,
            options: self.options,
            ring_size: self.ring_size,
        })
    }
}

/// Reads `*NODE`, `*ELEMENT`, `*MATERIAL`, `*INITIAL`, `*BOUNDARY`, `*LOAD`,
/// `*DATES`, `*TIME STEP` and `*OPTIONS` cards into `builder`. Models
/// referenced by `*ELEMENT, MODEL=...` must already be registered. Any other
/// keyword is logged at `warn` and skipped.
pub fn apply_deck(builder: &mut ProblemBuilder, deck: &Deck) -> Result<(), BuildError> {
    for card in &deck.cards {
        match card.keyword.as_str() {
            "NODE" => apply_node(builder, card)?,
            "ELEMENT" => apply_element(builder, card)?,
            "MATERIAL" => apply_material(builder, card)?,
            "INITIAL" => apply_initial(builder, card)?,
            "BOUNDARY" => apply_boundary(builder, card)?,
            "LOAD" => apply_load(builder, card)?,
            "DATES" => apply_dates(builder, card)?,
            "TIME STEP" => apply_time_step(builder, card)?,
            "OPTIONS" => apply_options(builder, card),
            other => log::warn!("line {}: ignoring unrecognized card *{other}", card.line_start),
        }
    }
    Ok(())
}

fn apply_node(builder: &mut ProblemBuilder, card: &Card) -> Result<(), BuildError> {
    let mut ids = Vec::new();
    for line in &card.data_lines {
        let fields = split_fields(line);
        if fields.len() < 2 {
            return Err(BuildError::Deck { line: card.line_start, message: "*NODE needs id,x[,y,z]".to_string() });
        }
        let id: u64 = fields[0]
            .parse()
            .map_err(|_| BuildError::Deck { line: card.line_start, message: format!("bad node id '{}'", fields[0]) })?;
        let x = parse_f64(fields[1], card.line_start)?;
        let y = if fields.len() > 2 { parse_f64(fields[2], card.line_start)? } else { 0.0 };
        let z = if fields.len() > 3 { parse_f64(fields[3], card.line_start)? } else { 0.0 };
        builder.add_node(id, [x, y, z]);
        ids.push(id);
    }
    if let Some(name) = param(card, "NSET") {
        builder.add_node_set(NodeSet { name: name.to_string(), nodes: ids });
    }
    Ok(())
}

fn apply_element(builder: &mut ProblemBuilder, card: &Card) -> Result<(), BuildError> {
    let model_name = required_param(card, "MODEL")?.to_string();
    let material_name = required_param(card, "MATERIAL")?.to_string();
    let mut ids = Vec::new();
    for line in &card.data_lines {
        let fields = split_fields(line);
        if fields.len() < 2 {
            return Err(BuildError::Deck {
                line: card.line_start,
                message: "*ELEMENT needs id,node1[,node2,...]".to_string(),
            });
        }
        let id: u64 = fields[0].parse().map_err(|_| BuildError::Deck {
            line: card.line_start,
            message: format!("bad element id '{}'", fields[0]),
        })?;
        let nodes: Vec<u64> = fields[1..]
            .iter()
            .map(|f| f.parse())
            .collect::<Result<_, _>>()
            .map_err(|_| BuildError::Deck { line: card.line_start, message: "bad node reference".to_string() })?;
        builder.add_element(id, nodes, &model_name, &material_name)?;
        ids.push(id);
    }
    if let Some(name) = param(card, "ELSET") {
        builder.add_element_set(ElementSet { name: name.to_string(), elements: ids });
    }
    Ok(())
}

fn apply_material(builder: &mut ProblemBuilder, card: &Card) -> Result<(), BuildError> {
    let name = required_param(card, "NAME")?.to_string();
    let model_name = required_param(card, "MODEL")?.to_string();
    let mut raw = HashMap::new();
    for line in &card.data_lines {
        let fields = split_fields(line);
        if fields.len() != 2 {
            return Err(BuildError::Deck { line: card.line_start, message: "material property needs KEY,value".to_string() });
        }
        raw.insert(fields[0].to_lowercase(), parse_f64(fields[1], card.line_start)?);
    }
    let model = builder.mesh.models.get(&model_name)?.clone();
    let mut material = Material::new(name, model_name, model.properties().property_count);
    model.read_material_properties(&mut material, &raw).map_err(|e| BuildError::Deck {
        line: card.line_start,
        message: e.to_string(),
    })?;
    builder.add_material(material);
    Ok(())
}

fn apply_initial(builder: &mut ProblemBuilder, card: &Card) -> Result<(), BuildError> {
    let node_set = required_param(card, "NSET")?.to_string();
    let equation_name = required_param(card, "EQUATION")?.to_string();
    let line = card.data_lines.first().ok_or_else(|| BuildError::Deck {
        line: card.line_start,
        message: "*INITIAL needs one data line with a value".to_string(),
    })?;
    let value = parse_f64(line, card.line_start)?;
    builder.add_initial_condition(InitialCondition { node_set, equation_name, value });
    Ok(())
}

fn apply_boundary(builder: &mut ProblemBuilder, card: &Card) -> Result<(), BuildError> {
    let node_set = required_param(card, "NSET")?.to_string();
    let equation_name = required_param(card, "EQUATION")?.to_string();
    let mut points = Vec::new();
    for line in &card.data_lines {
        let fields = split_fields(line);
        match fields.len() {
            1 => points.push((0.0, parse_f64(fields[0], card.line_start)?)),
            2 => points.push((parse_f64(fields[0], card.line_start)?, parse_f64(fields[1], card.line_start)?)),
            _ => {
                return Err(BuildError::Deck {
                    line: card.line_start,
                    message: "*BOUNDARY data line must be value or t,value".to_string(),
                });
            }
        }
    }
    if points.is_empty() {
        return Err(BuildError::Deck { line: card.line_start, message: "*BOUNDARY needs at least one value".to_string() });
    }
    let value = Curve::new(format!("{node_set}:{equation_name}"), &points);
    builder.add_boundary_condition(DirichletBC { node_set, equation_name, value });
    Ok(())
}

fn apply_load(builder: &mut ProblemBuilder, card: &Card) -> Result<(), BuildError> {
    let element_set = required_param(card, "ELSET")?.to_string();
    let name = required_param(card, "NAME")?.to_string();
    let line = card.data_lines.first().ok_or_else(|| BuildError::Deck {
        line: card.line_start,
        message: "*LOAD needs one data line with a magnitude".to_string(),
    })?;
    let magnitude = parse_f64(line, card.line_start)?;
    builder.add_load(element_set, Load { name, magnitude });
    Ok(())
}

fn apply_dates(builder: &mut ProblemBuilder, card: &Card) -> Result<(), BuildError> {
    let mut values = Vec::new();
    for line in &card.data_lines {
        for field in split_fields(line) {
            values.push(parse_f64(field, card.line_start)?);
        }
    }
    builder.set_dates(values);
    Ok(())
}

fn apply_time_step(builder: &mut ProblemBuilder, card: &Card) -> Result<(), BuildError> {
    let mut ctrl = TimeStepController::default();
    if let Some(v) = param(card, "DT_INI") {
        ctrl.dt_ini = parse_f64(v, card.line_start)?;
    }
    if let Some(v) = param(card, "DT_MIN") {
        ctrl.dt_min = parse_f64(v, card.line_start)?;
    }
    if let Some(v) = param(card, "DT_MAX") {
        ctrl.dt_max = parse_f64(v, card.line_start)?;
    }
    if let Some(v) = param(card, "REDUCTION") {
        ctrl.reduction_factor = parse_f64(v, card.line_start)?;
    }
    if let Some(v) = param(card, "RAISE") {
        ctrl.raise_cap = parse_f64(v, card.line_start)?;
    }
    if let Some(v) = param(card, "RATIO") {
        ctrl.target_ratio = parse_f64(v, card.line_start)?;
    }
    builder.set_time_step(ctrl);
    if let Some(line) = card.data_lines.first() {
        let objectives = split_fields(line)
            .into_iter()
            .map(|f| parse_f64(f, card.line_start))
            .collect::<Result<_, _>>()?;
        builder.set_objectives(objectives);
    }
    Ok(())
}

fn apply_options(builder: &mut ProblemBuilder, card: &Card) {
    let mut options = Options::default();
    if let Some(v) = param(card, "SOLVER") {
        options.solver = v.to_string();
    }
    if let Some(v) = param(card, "FF") {
        if let Ok(f) = v.parse() {
            options.fill_factor = f;
        }
    }
    if let Some(v) = param(card, "LEVEL") {
        if let Ok(n) = v.parse() {
            options.print_level = n;
        }
    }
    if let Some(v) = param(card, "WITH") {
        options.driver_variant = v.to_string();
    }
    if card.parameters.iter().any(|p| p.key == "READONLY") {
        options.readonly = true;
    }
    if let Some(v) = param(card, "GRAPH") {
        options.graph_method = Some(v.to_string());
    }
    if let Some(v) = param(card, "EORDERING") {
        options.eordering = Some(v.to_string());
    }
    if let Some(v) = param(card, "NORDERING") {
        options.nordering = Some(v.to_string());
    }
    if let Some(v) = param(card, "POSTPROCESSING") {
        options.postprocessing = Some(v.to_string());
    }
    builder.set_options(options);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtfem_core::{ElementProperties, ModelError, ModelProperties, NamedOutput, OutputPoint};
    use nalgebra::{DMatrix, DVector};

    struct OneEqModel {
        props: ModelProperties,
    }

    impl OneEqModel {
        fn new() -> Arc<dyn Model> {
            Arc::new(Self {
                props: ModelProperties {
                    equation_names: vec!["u".to_string()],
                    unknown_names: vec!["u".to_string()],
                    property_count: 1,
                    merge_explicit_terms: false,
                },
            })
        }
    }

    impl Model for OneEqModel {
        fn name(&self) -> &str {
            "one_eq"
        }
        fn properties(&self) -> &ModelProperties {
            &self.props
        }
        fn read_material_properties(&self, material: &mut Material, raw: &HashMap<String, f64>) -> Result<(), ModelError> {
            material.set_property(0, raw.get("k").copied().unwrap_or(0.0));
            Ok(())
        }
        fn define_element_properties(&self, properties: &mut ElementProperties) {
            *properties = ElementProperties::default();
        }
        fn compute_initial_state(&self, _ctx: &mut rtfem_core::ElementCtx) -> Result<(), ModelError> {
            Ok(())
        }
        fn compute_explicit_terms(&self, _ctx: &mut rtfem_core::ElementCtx) -> Result<(), ModelError> {
            Ok(())
        }
        fn compute_implicit_terms(&self, _ctx: &mut rtfem_core::ElementCtx) -> Result<(), ModelError> {
            Ok(())
        }
        fn compute_matrix(&self, _ctx: &rtfem_core::ElementCtx) -> Result<DMatrix<f64>, ModelError> {
            Ok(DMatrix::zeros(2, 2))
        }
        fn compute_residu(&self, _ctx: &rtfem_core::ElementCtx) -> Result<DVector<f64>, ModelError> {
            Ok(DVector::zeros(2))
        }
        fn compute_loads(&self, _ctx: &rtfem_core::ElementCtx, _load: &Load) -> Result<DVector<f64>, ModelError> {
            Ok(DVector::zeros(2))
        }
        fn compute_outputs(&self, _ctx: &rtfem_core::ElementCtx, _point: &OutputPoint) -> Vec<NamedOutput> {
            vec![]
        }
    }

    #[test]
    fn deck_builds_a_runnable_problem() {
        let src = r#"
*NODE, NSET=NALL
1,0,0,0
2,1,0,0
*ELEMENT, MODEL=one_eq, MATERIAL=mat1, ELSET=EALL
1,1,2
*MATERIAL, NAME=mat1, MODEL=one_eq
K,2.0
*INITIAL, NSET=NALL, EQUATION=u
0.0
*BOUNDARY, NSET=NALL, EQUATION=u
1.0
*LOAD, ELSET=EALL, NAME=flux
5.0
*DATES
0.0, 1.0
*TIME STEP, DT_INI=0.5, DT_MIN=0.1, DT_MAX=1.0
1.0
*OPTIONS, SOLVER=supernodal-csc, LEVEL=2
"#;
        let deck = Deck::parse_str(src).unwrap();
        let mut builder = ProblemBuilder::new();
        builder.register_model(OneEqModel::new());
        apply_deck(&mut builder, &deck).unwrap();
        let problem = builder.build().unwrap();
        assert_eq!(problem.mesh.num_dofs(), 2);
        assert_eq!(problem.dates.len(), 2);
        assert_eq!(problem.objectives, vec![1.0]);
        assert_eq!(problem.time_step.dt_ini, 0.5);
        assert_eq!(problem.options.solver, "supernodal-csc");
    }

    #[test]
    fn unknown_card_is_skipped_not_fatal() {
        let src = "*WEIRDCARD, X=1\nfoo\n*DATES\n0.0,1.0\n";
        let deck = Deck::parse_str(src).unwrap();
        let mut builder = ProblemBuilder::new();
        apply_deck(&mut builder, &deck).unwrap();
    }
}
