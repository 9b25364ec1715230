//! End-to-end scenarios exercising the Driver/Assembler/Ring/Backend stack
//! together through the [`rtfem_core::Model`] contract, using the built-in
//! linear diffusion element as the test fixture.

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use rtfem_core::{Curve, Element, ElementCtx, ElementProperties, Load, Material, Mesh, Model, ModelError,
    ModelProperties, NamedOutput, Node, NodeSet, OutputPoint, Sets};
use rtfem_solver::{
    default_backend, BoundaryConditions, Dates, DiffusionModel, DirichletBC, Driver, DriverStatus, IterationController,
    Loads, Options, Problem, TimeStepController,
};

fn two_node_mesh(conductivity: f64, capacity: f64) -> Mesh {
    let mut mesh = Mesh::new();
    mesh.add_node(Node::new(1, [0.0, 0.0, 0.0]));
    mesh.add_node(Node::new(2, [1.0, 0.0, 0.0]));
    mesh.models.register(Arc::new(DiffusionModel::new()));
    mesh.add_element(Element::new(1, vec![1, 2], "diffusion", "rod", 1));

    let mut material = Material::new("rod", "diffusion", 2);
    material.set_property(0, conductivity);
    material.set_property(1, capacity);
    mesh.materials.add_material(material);
    mesh.materials.assign(1, "rod");

    mesh.assign_dofs().expect("two-node mesh numbers cleanly");
    mesh
}

fn two_node_sets() -> Sets {
    let mut sets = Sets::new();
    sets.add_node_set(NodeSet { name: "left".to_string(), nodes: vec![1] });
    sets.add_node_set(NodeSet { name: "right".to_string(), nodes: vec![2] });
    sets
}

fn flat_bcs(right_value: f64) -> BoundaryConditions {
    let mut bcs = BoundaryConditions::new();
    bcs.add(DirichletBC {
        node_set: "left".to_string(),
        equation_name: "temperature".to_string(),
        value: Curve::new("left", &[(0.0, 0.0), (1.0e9, 0.0)]),
    });
    bcs.add(DirichletBC {
        node_set: "right".to_string(),
        equation_name: "temperature".to_string(),
        value: Curve::new("right", &[(0.0, right_value), (1.0e9, right_value)]),
    });
    bcs
}

fn ramped_bcs(end_time: f64, end_value: f64) -> BoundaryConditions {
    let mut bcs = BoundaryConditions::new();
    bcs.add(DirichletBC {
        node_set: "left".to_string(),
        equation_name: "temperature".to_string(),
        value: Curve::new("left", &[(0.0, 0.0), (1.0e9, 0.0)]),
    });
    bcs.add(DirichletBC {
        node_set: "right".to_string(),
        equation_name: "temperature".to_string(),
        value: Curve::new("right", &[(0.0, 0.0), (end_time, end_value), (1.0e9, end_value)]),
    });
    bcs
}

#[test]
fn scenario_1_steady_diffusion_converges_in_one_iteration() {
    let mesh = two_node_mesh(1.0, 0.0);
    let problem = Problem {
        mesh,
        sets: two_node_sets(),
        boundary_conditions: flat_bcs(1.0),
        loads: Loads::new(),
        initial_conditions: vec![],
        dates: Dates::new(vec![0.0, 1.0]),
        objectives: vec![1.0, 1.0],
        time_step: TimeStepController { dt_min: 1e-6, dt_max: 10.0, dt_ini: 1.0, ..Default::default() },
        iteration: IterationController::default(),
        options: Options::default(),
        ring_size: 3,
    };

    let driver = Driver::new(&problem, default_backend());
    let mut ring = driver.initialize().expect("initialization succeeds");
    let status = driver.run(&mut ring, 0);

    assert_eq!(status, DriverStatus::ConvergedAllDates);
    assert!((ring.current().unknowns[0] - 0.0).abs() < 1e-10);
    assert!((ring.current().unknowns[1] - 1.0).abs() < 1e-10);
}

#[test]
fn scenario_2_dt_adaptation_sums_exactly_to_the_interval() {
    let mesh = two_node_mesh(1.0, 0.0);
    let problem = Problem {
        mesh,
        sets: two_node_sets(),
        boundary_conditions: ramped_bcs(1.0, 1.0),
        loads: Loads::new(),
        initial_conditions: vec![],
        dates: Dates::new(vec![0.0, 1.0]),
        objectives: vec![0.1, 0.1],
        time_step: TimeStepController { dt_min: 0.01, dt_max: 1.0, dt_ini: 0.1, ..Default::default() },
        iteration: IterationController::default(),
        options: Options::default(),
        ring_size: 3,
    };

    let driver = Driver::new(&problem, default_backend());
    let mut ring = driver.initialize().expect("initialization succeeds");
    let status = driver.run(&mut ring, 0);

    assert_eq!(status, DriverStatus::ConvergedAllDates);
    assert_eq!(ring.current().t, 1.0, "accepted dt must land exactly on the date, no drift");
}

struct FailsAboveDt {
    threshold: f64,
    properties: ModelProperties,
}

impl FailsAboveDt {
    fn new(threshold: f64) -> Self {
        Self {
            threshold,
            properties: ModelProperties {
                equation_names: vec!["u".to_string()],
                unknown_names: vec!["u".to_string()],
                property_count: 0,
                merge_explicit_terms: false,
            },
        }
    }
}

impl Model for FailsAboveDt {
    fn name(&self) -> &str {
        "flaky"
    }
    fn properties(&self) -> &ModelProperties {
        &self.properties
    }
    fn read_material_properties(&self, _m: &mut Material, _raw: &HashMap<String, f64>) -> Result<(), ModelError> {
        Ok(())
    }
    fn define_element_properties(&self, properties: &mut ElementProperties) {
        properties.implicit_terms = 0;
        properties.explicit_terms = 0;
        properties.constant_terms = 0;
    }
    fn compute_initial_state(&self, _ctx: &mut ElementCtx) -> Result<(), ModelError> {
        Ok(())
    }
    fn compute_explicit_terms(&self, _ctx: &mut ElementCtx) -> Result<(), ModelError> {
        Ok(())
    }
    fn compute_implicit_terms(&self, ctx: &mut ElementCtx) -> Result<(), ModelError> {
        if ctx.dt > self.threshold {
            return Err(ModelError::Evaluation {
                model: self.name().to_string(),
                element: ctx.element_id,
                reason: format!("dt {} exceeds stability threshold {}", ctx.dt, self.threshold),
            });
        }
        Ok(())
    }
    fn compute_matrix(&self, _ctx: &ElementCtx) -> Result<DMatrix<f64>, ModelError> {
        Ok(DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]))
    }
    fn compute_residu(&self, ctx: &ElementCtx) -> Result<DVector<f64>, ModelError> {
        let u = DVector::from_row_slice(ctx.unknowns_current);
        Ok(DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]) * u)
    }
    fn compute_loads(&self, _ctx: &ElementCtx, _load: &Load) -> Result<DVector<f64>, ModelError> {
        Ok(DVector::zeros(2))
    }
    fn compute_outputs(&self, _ctx: &ElementCtx, _point: &OutputPoint) -> Vec<NamedOutput> {
        vec![]
    }
}

fn flaky_mesh(threshold: f64) -> Mesh {
    let mut mesh = Mesh::new();
    mesh.add_node(Node::new(1, [0.0, 0.0, 0.0]));
    mesh.add_node(Node::new(2, [1.0, 0.0, 0.0]));
    mesh.models.register(Arc::new(FailsAboveDt::new(threshold)));
    mesh.add_element(Element::new(1, vec![1, 2], "flaky", "rod", 1));
    let material = Material::new("rod", "flaky", 0);
    mesh.materials.add_material(material);
    mesh.materials.assign(1, "rod");
    mesh.assign_dofs().expect("flaky mesh numbers cleanly");
    mesh
}

#[test]
fn scenario_3_step_back_retries_until_dt_is_within_the_stable_range() {
    let mesh = flaky_mesh(0.25);
    let problem = Problem {
        mesh,
        sets: two_node_sets(),
        boundary_conditions: flat_bcs(1.0),
        loads: Loads::new(),
        initial_conditions: vec![],
        dates: Dates::new(vec![0.0, 1.0]),
        objectives: vec![1.0, 1.0],
        time_step: TimeStepController {
            dt_min: 1e-6,
            dt_max: 1.0,
            dt_ini: 0.5,
            reduction_factor: 0.5,
            raise_cap: 2.0,
            target_ratio: 1.0,
        },
        iteration: IterationController { max_repetitions: 4, ..Default::default() },
        options: Options::default(),
        ring_size: 3,
    };

    let driver = Driver::new(&problem, default_backend());
    let mut ring = driver.initialize().expect("initialization succeeds");
    let status = driver.run(&mut ring, 0);

    assert_eq!(status, DriverStatus::ConvergedAllDates);
    assert_eq!(ring.current().t, 1.0, "every accepted step reduces dt to 0.5 * reduction_factor = 0.25");
}

#[test]
fn scenario_4_restart_matches_a_continuous_run() {
    let end_time = 2.0;
    let end_value = 1.0;
    let dt = 0.1;
    let capacity = 1.0;
    let conductivity = 1.0;
    let step_controller = TimeStepController { dt_min: dt, dt_max: dt, dt_ini: dt, ..Default::default() };

    let continuous = Problem {
        mesh: two_node_mesh(conductivity, capacity),
        sets: two_node_sets(),
        boundary_conditions: ramped_bcs(end_time, end_value),
        loads: Loads::new(),
        initial_conditions: vec![],
        dates: Dates::new(vec![0.0, 1.0, 2.0]),
        objectives: vec![0.1, 0.1],
        time_step: step_controller.clone(),
        iteration: IterationController::default(),
        options: Options::default(),
        ring_size: 3,
    };
    let continuous_driver = Driver::new(&continuous, default_backend());
    let mut continuous_ring = continuous_driver.initialize().expect("initialization succeeds");
    let continuous_status = continuous_driver.run(&mut continuous_ring, 0);
    assert_eq!(continuous_status, DriverStatus::ConvergedAllDates);

    let first_half = Problem {
        mesh: two_node_mesh(conductivity, capacity),
        sets: two_node_sets(),
        boundary_conditions: ramped_bcs(end_time, end_value),
        loads: Loads::new(),
        initial_conditions: vec![],
        dates: Dates::new(vec![0.0, 1.0]),
        objectives: vec![0.1, 0.1],
        time_step: step_controller.clone(),
        iteration: IterationController::default(),
        options: Options::default(),
        ring_size: 3,
    };
    let first_driver = Driver::new(&first_half, default_backend());
    let mut first_ring = first_driver.initialize().expect("initialization succeeds");
    let first_status = first_driver.run(&mut first_ring, 0);
    assert_eq!(first_status, DriverStatus::ConvergedAllDates);

    let snapshot = first_ring.store_current();

    let second_half = Problem {
        mesh: two_node_mesh(conductivity, capacity),
        sets: two_node_sets(),
        boundary_conditions: ramped_bcs(end_time, end_value),
        loads: Loads::new(),
        initial_conditions: vec![],
        dates: Dates::new(vec![1.0, 2.0]),
        objectives: vec![0.1, 0.1],
        time_step: step_controller,
        iteration: IterationController::default(),
        options: Options::default(),
        ring_size: 3,
    };
    let second_driver = Driver::new(&second_half, default_backend());
    let mut second_ring = second_driver.initialize().expect("initialization succeeds");
    second_ring.load_current(&snapshot).expect("restart payload matches this problem's sizing");
    let second_status = second_driver.run(&mut second_ring, 0);
    assert_eq!(second_status, DriverStatus::ConvergedAllDates);

    assert_eq!(continuous_ring.current().t, second_ring.current().t);
    for (a, b) in continuous_ring.current().unknowns.iter().zip(second_ring.current().unknowns.iter()) {
        assert!((a - b).abs() < 1e-9, "restarted run must match the continuous run within tolerance");
    }
}

#[test]
fn scenario_5_shared_node_assembly_is_symmetric() {
    use rtfem_solver::{Assembler, SparseMatrix};

    let mut mesh = Mesh::new();
    mesh.add_node(Node::new(1, [0.0, 0.0, 0.0]));
    mesh.add_node(Node::new(2, [1.0, 0.0, 0.0]));
    mesh.add_node(Node::new(3, [2.0, 0.0, 0.0]));
    mesh.models.register(Arc::new(DiffusionModel::new()));
    mesh.add_element(Element::new(1, vec![1, 2], "diffusion", "rod", 1));
    mesh.add_element(Element::new(2, vec![2, 3], "diffusion", "rod", 1));
    let mut material = Material::new("rod", "diffusion", 2);
    material.set_property(0, 1.0);
    mesh.materials.add_material(material);
    mesh.materials.assign(1, "rod");
    mesh.materials.assign(2, "rod");
    mesh.assign_dofs().expect("three-node mesh numbers cleanly");

    let problem = Problem {
        mesh,
        sets: Sets::new(),
        boundary_conditions: BoundaryConditions::new(),
        loads: Loads::new(),
        initial_conditions: vec![],
        dates: Dates::new(vec![0.0, 1.0]),
        objectives: vec![1.0, 1.0, 1.0],
        time_step: TimeStepController::default(),
        iteration: IterationController::default(),
        options: Options::default(),
        ring_size: 3,
    };

    let driver = Driver::new(&problem, default_backend());
    let mut ring = driver.initialize().expect("initialization succeeds");
    let mut matrix = SparseMatrix::from_mesh(&problem.mesh);
    let assembler = Assembler::default();
    assembler
        .compute_implicit_terms(&problem.mesh, &mut ring, 0.0, 1.0, 0)
        .expect("implicit terms compute cleanly");
    assembler
        .assemble(&problem.mesh, &ring, &mut matrix, &problem.loads, &problem.sets, 0.0, 1.0, 0)
        .expect("assembly succeeds");

    let triplets = matrix.to_triplets();
    let mut entries: HashMap<(usize, usize), f64> = HashMap::new();
    for i in 0..triplets.row_indices.len() {
        entries.insert((triplets.row_indices[i], triplets.col_indices[i]), triplets.values[i]);
    }
    for (&(r, c), &v) in &entries {
        let transposed = entries.get(&(c, r)).copied().unwrap_or(0.0);
        assert!((v - transposed).abs() < 1e-12, "global matrix must be symmetric at ({r},{c})");
    }
}

#[test]
fn scenario_6_budget_exhaustion_leaves_current_untouched() {
    struct AlwaysFails {
        properties: ModelProperties,
    }
    impl Model for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }
        fn properties(&self) -> &ModelProperties {
            &self.properties
        }
        fn read_material_properties(&self, _m: &mut Material, _raw: &HashMap<String, f64>) -> Result<(), ModelError> {
            Ok(())
        }
        fn define_element_properties(&self, properties: &mut ElementProperties) {
            properties.implicit_terms = 0;
            properties.explicit_terms = 0;
            properties.constant_terms = 0;
        }
        fn compute_initial_state(&self, _ctx: &mut ElementCtx) -> Result<(), ModelError> {
            Ok(())
        }
        fn compute_explicit_terms(&self, _ctx: &mut ElementCtx) -> Result<(), ModelError> {
            Ok(())
        }
        fn compute_implicit_terms(&self, ctx: &mut ElementCtx) -> Result<(), ModelError> {
            Err(ModelError::Evaluation {
                model: self.name().to_string(),
                element: ctx.element_id,
                reason: "always fails".to_string(),
            })
        }
        fn compute_matrix(&self, _ctx: &ElementCtx) -> Result<DMatrix<f64>, ModelError> {
            Ok(DMatrix::zeros(2, 2))
        }
        fn compute_residu(&self, _ctx: &ElementCtx) -> Result<DVector<f64>, ModelError> {
            Ok(DVector::zeros(2))
        }
        fn compute_loads(&self, _ctx: &ElementCtx, _load: &Load) -> Result<DVector<f64>, ModelError> {
            Ok(DVector::zeros(2))
        }
        fn compute_outputs(&self, _ctx: &ElementCtx, _point: &OutputPoint) -> Vec<NamedOutput> {
            vec![]
        }
    }

    let mut mesh = Mesh::new();
    mesh.add_node(Node::new(1, [0.0, 0.0, 0.0]));
    mesh.add_node(Node::new(2, [1.0, 0.0, 0.0]));
    mesh.models.register(Arc::new(AlwaysFails {
        properties: ModelProperties {
            equation_names: vec!["u".to_string()],
            unknown_names: vec!["u".to_string()],
            property_count: 0,
            merge_explicit_terms: false,
        },
    }));
    mesh.add_element(Element::new(1, vec![1, 2], "always-fails", "rod", 1));
    mesh.materials.add_material(Material::new("rod", "always-fails", 0));
    mesh.materials.assign(1, "rod");
    mesh.assign_dofs().expect("mesh numbers cleanly");

    let problem = Problem {
        mesh,
        sets: two_node_sets(),
        boundary_conditions: BoundaryConditions::new(),
        loads: Loads::new(),
        initial_conditions: vec![],
        dates: Dates::new(vec![0.0, 1.0]),
        objectives: vec![1.0, 1.0],
        time_step: TimeStepController::default(),
        iteration: IterationController { max_repetitions: 0, ..Default::default() },
        options: Options::default(),
        ring_size: 3,
    };

    let driver = Driver::new(&problem, default_backend());
    let mut ring = driver.initialize().expect("initialization succeeds");
    let before = ring.current().unknowns.clone();
    let before_t = ring.current().t;

    let status = driver.run(&mut ring, 0);

    match status {
        DriverStatus::Aborted(_) => {}
        other => panic!("expected Aborted, got {other:?}"),
    }
    assert_eq!(ring.current().t, before_t, "current must not advance past a budget-exhausted step");
    assert_eq!(ring.current().unknowns.as_slice(), before.as_slice());
}
