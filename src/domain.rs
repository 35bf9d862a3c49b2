/// Degrees of Freedom
pub mod dof;
/// Reconstruction and point evaluation of finite element fields
pub mod fields;
/// Maps between the reference cell and the cells of a Mesh
pub mod mapping;
/// The internal geometric structure of a Domain
pub mod mesh;

pub use dof::{sign_table::SignTable, Dof, DofAddress, DofHandler};
pub use fields::FieldEvaluator;
pub use mapping::{CellMapping, MappingCache, MappingQ};
pub use mesh::Mesh;
