//! Generalized interpolation onto conforming finite element spaces over quadrilateral and hexahedral meshes
//!
//! A [Mesh] is refined and optionally distorted, a [FiniteElement] ([Raviart-Thomas](basis::raviart_thomas)
//! or [Lagrange](basis::lagrange)) is distributed over it by a [DofHandler], and functions are interpolated
//! into the resulting space through the mapping of every cell. A [FieldEvaluator] reconstructs the field
//! at arbitrary points, which makes it possible to check that interpolation is a projection.

/// Reference elements: polynomial spaces, nodal bases and their local functionals
pub mod basis;
/// Meshes, cell mappings, degrees of freedom and fields
pub mod domain;
pub mod error;
/// Gauss-Legendre quadrature on the reference cell and its faces
pub mod integration;
/// Interpolation operator and the projection check built on it
pub mod interpolation;

pub use basis::FiniteElement;
pub use domain::{DofHandler, FieldEvaluator, MappingCache, MappingQ, Mesh};
pub use error::{FemError, Result};
pub use interpolation::{
    check_projection, interpolate, interpolate_checked, FnFunction, PolynomialField, ProjectionReport,
    VectorFunction,
};
