use std::collections::HashMap;

use crate::curve::Curve;

/// A material definition attached to one or more elements.
///
/// Unlike a fixed struct-of-fields material (appropriate when every element
/// uses the same handful of named properties), a coupled multi-physics model
/// can demand an arbitrary, model-defined set of scalar properties plus
/// tabulated curves. `Material` therefore stores properties as a dense,
/// model-indexed array (populated by [`crate::model::Model::read_material_properties`])
/// alongside named curves.
#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    pub model_name: String,
    properties: Vec<f64>,
    curves: HashMap<String, Curve>,
}

impl Material {
    pub fn new(name: impl Into<String>, model_name: impl Into<String>, property_count: usize) -> Self {
        Self {
            name: name.into(),
            model_name: model_name.into(),
            properties: vec![0.0; property_count],
            curves: HashMap::new(),
        }
    }

    pub fn property(&self, index: usize) -> f64 {
        self.properties[index]
    }

    pub fn set_property(&mut self, index: usize, value: f64) {
        self.properties[index] = value;
    }

    pub fn properties(&self) -> &[f64] {
        &self.properties
    }

    pub fn add_curve(&mut self, curve: Curve) {
        self.curves.insert(curve.name.clone(), curve);
    }

    pub fn curve(&self, name: &str) -> Option<&Curve> {
        self.curves.get(name)
    }
}

/// All materials known to a problem, plus the element -> material assignment.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
    element_materials: HashMap<u64, String>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn material_mut(&mut self, name: &str) -> Option<&mut Material> {
        self.materials.get_mut(name)
    }

    pub fn assign(&mut self, element_id: u64, material_name: impl Into<String>) {
        self.element_materials.insert(element_id, material_name.into());
    }

    pub fn material_for_element(&self, element_id: u64) -> Option<&Material> {
        self.element_materials
            .get(&element_id)
            .and_then(|name| self.materials.get(name.as_str()))
    }

    pub fn material_names(&self) -> Vec<&str> {
        self.materials.keys().map(String::as_str).collect()
    }
}
