use std::collections::HashMap;

use crate::element::Element;
use crate::error::CoreError;
use crate::material::MaterialLibrary;
use crate::model::ModelRegistry;
use crate::names::NameTable;
use crate::node::Node;

/// Summary statistics produced after numbering, handy for logging and
/// sanity-checking a deck before a run starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshStatistics {
    pub node_count: usize,
    pub element_count: usize,
    pub num_dofs: usize,
}

/// The geometry, connectivity and numbering of a problem: nodes, elements,
/// the material library and the model registry they reference.
#[derive(Default)]
pub struct Mesh {
    nodes: HashMap<u64, Node>,
    elements: Vec<Element>,
    pub materials: MaterialLibrary,
    pub models: ModelRegistry,
    names: NameTable,
    num_dofs: usize,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn add_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn node(&self, id: u64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    /// Global id of a named equation/unknown, if any element has declared
    /// it during [`Self::assign_dofs`].
    pub fn equation_id(&self, name: &str) -> Option<crate::names::NameId> {
        self.names.get(name)
    }

    pub fn dof_for(&self, node_id: u64, equation_name: &str) -> Option<(i64, i64)> {
        let eq = self.equation_id(equation_name)?;
        self.nodes.get(&node_id)?.dof(eq)
    }

    pub fn statistics(&self) -> MeshStatistics {
        MeshStatistics {
            node_count: self.nodes.len(),
            element_count: self.elements.len(),
            num_dofs: self.num_dofs,
        }
    }

    /// Checks connectivity, assigns each element's local degrees of freedom
    /// (its `define_element_properties` term sizes and its node's global
    /// row/column indices per named equation), and records the total matrix
    /// dimension. Must run once before any assembly.
    pub fn assign_dofs(&mut self) -> Result<(), CoreError> {
        for element in &self.elements {
            for &node_id in &element.nodes {
                if !self.nodes.contains_key(&node_id) {
                    return Err(CoreError::DanglingNodeReference { element: element.id, node: node_id });
                }
            }
        }

        let mut next_index: i64 = 0;
        for element in &mut self.elements {
            let model = self.models.get(&element.model_name)?;
            let mut props = element.properties;
            model.define_element_properties(&mut props);
            element.properties = props;

            let eq_names = &model.properties().equation_names;
            debug_assert_eq!(eq_names.len(), element.equations_per_node);

            for (local_node_idx, &node_id) in element.nodes.iter().enumerate() {
                for (local_eq_idx, eq_name) in eq_names.iter().enumerate() {
                    let eq_id = self.names.intern(eq_name);
                    let node = self.nodes.get_mut(&node_id).expect("checked above");
                    let (row, col) = node.dof_or_assign(eq_id, &mut next_index);
                    let local_dof = local_node_idx * element.equations_per_node + local_eq_idx;
                    element.dof_map.set(local_dof, row, col);
                }
            }
        }

        self.num_dofs = next_index as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementProperties;
    use crate::material::Material;
    use crate::model::{ElementCtx, Load, ModelProperties, NamedOutput, OutputPoint};
    use nalgebra::{DMatrix, DVector};
    use std::sync::Arc;

    struct DummyModel {
        props: ModelProperties,
    }

    impl crate::model::Model for DummyModel {
        fn name(&self) -> &str {
            "dummy"
        }
        fn properties(&self) -> &ModelProperties {
            &self.props
        }
        fn read_material_properties(
            &self,
            _material: &mut Material,
            _raw: &std::collections::HashMap<String, f64>,
        ) -> Result<(), crate::error::ModelError> {
            Ok(())
        }
        fn define_element_properties(&self, properties: &mut ElementProperties) {
            properties.implicit_terms = 1;
            properties.explicit_terms = 1;
            properties.constant_terms = 0;
        }
        fn compute_initial_state(&self, _ctx: &mut ElementCtx) -> Result<(), crate::error::ModelError> {
            Ok(())
        }
        fn compute_explicit_terms(&self, _ctx: &mut ElementCtx) -> Result<(), crate::error::ModelError> {
            Ok(())
        }
        fn compute_implicit_terms(&self, _ctx: &mut ElementCtx) -> Result<(), crate::error::ModelError> {
            Ok(())
        }
        fn compute_matrix(&self, _ctx: &ElementCtx) -> Result<DMatrix<f64>, crate::error::ModelError> {
            Ok(DMatrix::zeros(2, 2))
        }
        fn compute_residu(&self, _ctx: &ElementCtx) -> Result<DVector<f64>, crate::error::ModelError> {
            Ok(DVector::zeros(2))
        }
        fn compute_loads(&self, _ctx: &ElementCtx, _load: &Load) -> Result<DVector<f64>, crate::error::ModelError> {
            Ok(DVector::zeros(2))
        }
        fn compute_outputs(&self, _ctx: &ElementCtx, _point: &OutputPoint) -> Vec<NamedOutput> {
            vec![]
        }
    }

    fn dummy_model() -> Arc<dyn crate::model::Model> {
        Arc::new(DummyModel {
            props: ModelProperties {
                equation_names: vec!["u".to_string()],
                unknown_names: vec!["u".to_string()],
                property_count: 0,
                merge_explicit_terms: false,
            },
        })
    }

    #[test]
    fn shared_nodes_get_shared_columns() {
        let mut mesh = Mesh::new();
        mesh.add_node(Node::new(1, [0.0, 0.0, 0.0]));
        mesh.add_node(Node::new(2, [1.0, 0.0, 0.0]));
        mesh.add_node(Node::new(3, [2.0, 0.0, 0.0]));
        mesh.models.register(dummy_model());

        mesh.add_element(Element::new(1, vec![1, 2], "dummy", "mat", 1));
        mesh.add_element(Element::new(2, vec![2, 3], "dummy", "mat", 1));

        mesh.assign_dofs().expect("numbering should succeed");
        assert_eq!(mesh.num_dofs(), 3);

        let (row_a, _) = mesh.elements()[0].dof_map.get(1);
        let (row_b, _) = mesh.elements()[1].dof_map.get(0);
        assert_eq!(row_a, row_b, "node 2 must share one column across both elements");
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let mut mesh = Mesh::new();
        mesh.add_node(Node::new(1, [0.0, 0.0, 0.0]));
        mesh.models.register(dummy_model());
        mesh.add_element(Element::new(1, vec![1, 2], "dummy", "mat", 1));
        assert!(mesh.assign_dofs().is_err());
    }
}
