/// An element-local degree-of-freedom map.
///
/// Indexed by `local_node_index * neq + local_equation_index`. A slot holds
/// `(row, col) = (INACTIVE, INACTIVE)` when this element does not carry that
/// equation at that node; otherwise both indices are the global row/column
/// assigned to it by [`crate::mesh::Mesh::assign_dofs`].
#[derive(Debug, Clone, Default)]
pub struct DofMap {
    slots: Vec<(i64, i64)>,
}

impl DofMap {
    pub fn new(len: usize) -> Self {
        Self { slots: vec![(crate::node::INACTIVE, crate::node::INACTIVE); len] }
    }

    pub fn set(&mut self, local_dof: usize, row: i64, col: i64) {
        self.slots[local_dof] = (row, col);
    }

    pub fn get(&self, local_dof: usize) -> (i64, i64) {
        self.slots[local_dof]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_active(&self, local_dof: usize) -> bool {
        self.slots[local_dof].1 != crate::node::INACTIVE
    }
}

/// Per-element sizes of the three term buffers a model maintains across
/// Newton iterations and time steps. Set once by
/// [`crate::model::Model::define_element_properties`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementProperties {
    pub implicit_terms: usize,
    pub explicit_terms: usize,
    pub constant_terms: usize,
}

/// A single finite element: the node list that defines its geometry plus the
/// model and material that give it physics.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: u64,
    pub nodes: Vec<u64>,
    pub model_name: String,
    pub material_name: String,
    pub equations_per_node: usize,
    pub dof_map: DofMap,
    pub properties: ElementProperties,
}

impl Element {
    pub fn new(
        id: u64,
        nodes: Vec<u64>,
        model_name: impl Into<String>,
        material_name: impl Into<String>,
        equations_per_node: usize,
    ) -> Self {
        let dof_map = DofMap::new(nodes.len() * equations_per_node);
        Self {
            id,
            nodes,
            model_name: model_name.into(),
            material_name: material_name.into(),
            equations_per_node,
            dof_map,
            properties: ElementProperties::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn local_dof_count(&self) -> usize {
        self.nodes.len() * self.equations_per_node
    }
}
