use std::collections::HashMap;

/// A named set of nodes, used to scope boundary conditions and point probes.
#[derive(Debug, Clone)]
pub struct NodeSet {
    pub name: String,
    pub nodes: Vec<u64>,
}

/// A named set of elements, used to scope loads and region-restricted models.
#[derive(Debug, Clone)]
pub struct ElementSet {
    pub name: String,
    pub elements: Vec<u64>,
}

/// Every named region in a problem.
#[derive(Debug, Clone, Default)]
pub struct Sets {
    pub node_sets: HashMap<String, NodeSet>,
    pub element_sets: HashMap<String, ElementSet>,
}

impl Sets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node_set(&mut self, set: NodeSet) {
        self.node_sets.insert(set.name.clone(), set);
    }

    pub fn add_element_set(&mut self, set: ElementSet) {
        self.element_sets.insert(set.name.clone(), set);
    }

    pub fn nodes(&self, set_name: &str) -> Option<&[u64]> {
        self.node_sets.get(set_name).map(|s| s.nodes.as_slice())
    }

    pub fn elements(&self, set_name: &str) -> Option<&[u64]> {
        self.element_sets.get(set_name).map(|s| s.elements.as_slice())
    }
}
