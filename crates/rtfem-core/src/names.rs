use std::collections::HashMap;

/// Global id of a named equation or unknown, shared by every model that
/// declares the same name. Two models that both declare an equation called
/// `"temperature"` resolve to the same [`NameId`] and therefore the same
/// global degree of freedom wherever they meet at a shared node.
pub type NameId = u32;

/// Interns equation/unknown names into small dense ids.
#[derive(Debug, Default, Clone)]
pub struct NameTable {
    ids: HashMap<String, NameId>,
    names: Vec<String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.names.len() as NameId;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<NameId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: NameId) -> &str {
        &self.names[id as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
