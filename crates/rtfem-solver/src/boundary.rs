use nalgebra::DVector;
use rtfem_core::{Curve, Element, Mesh};

/// A Dirichlet condition on one named equation over a node set, with its
/// prescribed value following a time curve (a constant is a flat two-point
/// curve).
#[derive(Debug, Clone)]
pub struct DirichletBC {
    pub node_set: String,
    pub equation_name: String,
    pub value: Curve,
}

/// All Dirichlet conditions in a problem.
#[derive(Debug, Clone, Default)]
pub struct BoundaryConditions {
    entries: Vec<DirichletBC>,
}

impl BoundaryConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bc: DirichletBC) {
        self.entries.push(bc);
    }

    /// Writes every condition's value at time `t` into `unknowns`, indexed
    /// by each affected node's global column for that equation.
    pub fn install(&self, mesh: &Mesh, sets: &rtfem_core::Sets, t: f64, unknowns: &mut DVector<f64>) {
        for bc in &self.entries {
            let Some(nodes) = sets.nodes(&bc.node_set) else { continue };
            let value = bc.value.evaluate(t);
            for &node_id in nodes {
                if let Some((_, col)) = mesh.dof_for(node_id, &bc.equation_name)
                    && col >= 0
                {
                    unknowns[col as usize] = value;
                }
            }
        }
    }

    /// Global row indices every condition pins, for clamping the assembled
    /// system before each linear solve.
    pub fn dirichlet_rows(&self, mesh: &Mesh, sets: &rtfem_core::Sets) -> Vec<usize> {
        let mut rows = Vec::new();
        for bc in &self.entries {
            let Some(nodes) = sets.nodes(&bc.node_set) else { continue };
            for &node_id in nodes {
                if let Some((row, _)) = mesh.dof_for(node_id, &bc.equation_name)
                    && row >= 0
                {
                    rows.push(row as usize);
                }
            }
        }
        rows
    }
}

/// A load applied over an element set.
#[derive(Debug, Clone)]
pub struct LoadEntry {
    pub element_set: String,
    pub load: rtfem_core::Load,
}

/// All loads in a problem.
#[derive(Debug, Clone, Default)]
pub struct Loads {
    entries: Vec<LoadEntry>,
}

impl Loads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, element_set: impl Into<String>, load: rtfem_core::Load) {
        self.entries.push(LoadEntry { element_set: element_set.into(), load });
    }

    /// Pairs every element in a load's named region with that load, for the
    /// assembler to iterate.
    pub fn applicable<'a>(
        &'a self,
        mesh: &'a Mesh,
        sets: &'a rtfem_core::Sets,
    ) -> impl Iterator<Item = (&'a Element, &'a rtfem_core::Load)> {
        self.entries.iter().flat_map(move |entry| {
            let region: &[u64] = sets.elements(&entry.element_set).unwrap_or(&[]);
            mesh.elements().iter().filter(|e| region.contains(&e.id)).map(move |e| (e, &entry.load))
        })
    }
}
