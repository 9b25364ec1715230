//! Shared data model and model contract for the rtfem transient PDE engine:
//! nodes, elements, materials, the DOF numbering pass, and the [`Model`]
//! trait every coupled physics implementation plugs into.

pub mod curve;
pub mod element;
pub mod error;
pub mod material;
pub mod mesh;
pub mod model;
pub mod names;
pub mod node;
pub mod sets;

pub use curve::Curve;
pub use element::{DofMap, Element, ElementProperties};
pub use error::{CoreError, ModelError};
pub use material::{Material, MaterialLibrary};
pub use mesh::{Mesh, MeshStatistics};
pub use model::{ElementCtx, Load, Model, ModelProperties, ModelRegistry, NamedOutput, OutputPoint};
pub use names::{NameId, NameTable};
pub use node::{Node, INACTIVE};
pub use sets::{ElementSet, NodeSet, Sets};
