use thiserror::Error;

/// Errors raised by a [`crate::model::Model`] implementation while it is invoked
/// from inside an assembly or time-stepping loop.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model '{model}' rejected material property '{property}': {reason}")]
    InvalidProperty {
        model: String,
        property: String,
        reason: String,
    },
    #[error("model '{model}' could not evaluate at element {element}: {reason}")]
    Evaluation { model: String, element: u64, reason: String },
    #[error("model '{model}' has no equation/unknown named '{name}'")]
    UnknownName { model: String, name: String },
}

/// Errors raised while building or numbering a [`crate::mesh::Mesh`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no model registered under name '{0}'")]
    ModelNotFound(String),
    #[error("element {element} references undefined node {node}")]
    DanglingNodeReference { element: u64, node: u64 },
    #[error("element {0} has no model assigned")]
    ElementHasNoModel(u64),
    #[error(transparent)]
    Model(#[from] ModelError),
}
