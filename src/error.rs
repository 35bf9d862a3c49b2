use thiserror::Error;

/// Top-level error type for mesh construction, interpolation and field evaluation
#[derive(Debug, Error)]
pub enum FemError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Element(#[from] ElementError),

    #[error(transparent)]
    Dof(#[from] DofError),

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Errors raised while building or modifying a `Mesh`
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("meshes must be 2 or 3 dimensional; got dimension {0}")]
    UnsupportedDimension(usize),

    #[error("point has {found} coordinates; expected {expected}")]
    PointDimension { expected: usize, found: usize },

    #[error("distortion factor {0} must be finite and non-negative")]
    InvalidDistortion(f64),

    #[error("cell {cell} is invalid: {reason}")]
    InvalidCell { cell: usize, reason: String },

    #[error("face with vertices {0:?} is shared by more than two cells")]
    NonManifoldFace(Vec<usize>),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Errors related to the geometry of individual cells
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry in cell {cell}: jacobian determinant {det:e} is below the allowed floor")]
    DegenerateGeometry { cell: usize, det: f64 },

    #[error("inverse mapping in cell {cell} did not converge after {iterations} iterations (residual {residual:e})")]
    InverseMapDidNotConverge {
        cell: usize,
        iterations: usize,
        residual: f64,
    },

    #[error("mapping order must be at least 1; got {0}")]
    InvalidMappingOrder(usize),
}

/// Errors raised while constructing a finite element descriptor
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("finite elements must be 2 or 3 dimensional; got dimension {0}")]
    UnsupportedDimension(usize),

    #[error("{family} elements do not support order {order}")]
    UnsupportedOrder { family: &'static str, order: usize },

    #[error("node matrix of {0} is singular; cannot construct a nodal basis")]
    SingularNodeMatrix(String),
}

/// Errors raised while distributing degrees of freedom
#[derive(Debug, Error)]
pub enum DofError {
    #[error("element dimension {element} does not match mesh dimension {mesh}")]
    DimensionMismatch { mesh: usize, element: usize },

    #[error("face {face} is parametrized differently by its two cells; higher order face moments cannot be matched")]
    MismatchedFaceOrientation { face: usize },
}

/// Errors raised while interpolating into, or evaluating, a finite element field
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("point {0:?} is not inside any cell of the mesh")]
    PointOutsideDomain(Vec<f64>),

    #[error("function has {found} components; the finite element expects {expected}")]
    ComponentMismatch { expected: usize, found: usize },

    #[error("cells disagree on shared dof {dof}: {first:e} vs {second:e}")]
    InconsistentSharedDof { dof: usize, first: f64, second: f64 },

    #[error("coefficient array has {found} entries; the dof handler has {expected} dofs")]
    CoefficientLengthMismatch { expected: usize, found: usize },

    #[error("dofs cover {dof_cells} cells in {dof_dim}D but the mappings cover {mapping_cells} cells in {mapping_dim}D")]
    MeshMismatch {
        dof_cells: usize,
        dof_dim: usize,
        mapping_cells: usize,
        mapping_dim: usize,
    },
}

/// Convenience type alias for results using [`FemError`]
pub type Result<T> = std::result::Result<T, FemError>;
