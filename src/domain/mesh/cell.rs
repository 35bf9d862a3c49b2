use nalgebra::DVector;
use smallvec::SmallVec;
use std::fmt;

/// Local vertex indices of a cell (4 for quadrilaterals, 8 for hexahedra)
pub type CellVertices = SmallVec<[usize; 8]>;

/// `Cell`s are the basic geometric unit of the [super::Mesh]
///
/// ## Layout
/// Local vertex `v` sits at the reference coordinate whose `d`th entry is bit `d` of `v`.
/// Local face `2d + s` is the face `x_d = s` of the reference cell `[0, 1]^D`:
///
/// ```text
///               3
///         2 --------- 3
///         |           |
///         |           |
///       0 |           | 1
///         |           |
///         |           |
///         0 --------- 1
///               2
/// ```
#[derive(Debug, Clone)]
pub struct Cell {
    pub id: usize,
    pub vertices: CellVertices,
    pub faces: SmallVec<[usize; 6]>,
    pub level: u8,
}

impl Cell {
    pub fn new(id: usize, vertices: CellVertices, level: u8) -> Self {
        Self {
            id,
            vertices,
            faces: SmallVec::new(),
            level,
        }
    }

    /// Global vertex ids of one of this cell's faces, in the cell's local order
    pub fn face_vertices(&self, dim: usize, local_face: usize) -> SmallVec<[usize; 4]> {
        face_local_vertices(dim, local_face)
            .iter()
            .map(|v| self.vertices[*v])
            .collect()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Cell {} (level {}) \t vertices: {:?}", self.id, self.level, self.vertices)
    }
}

pub fn n_vertices(dim: usize) -> usize {
    1 << dim
}

pub fn n_faces(dim: usize) -> usize {
    2 * dim
}

/// Local vertices on `local_face`, in increasing order
pub fn face_local_vertices(dim: usize, local_face: usize) -> SmallVec<[usize; 4]> {
    let (d, s) = (local_face / 2, local_face % 2);
    (0..n_vertices(dim))
        .filter(|v| (v >> d) & 1 == s)
        .collect()
}

/// Position of local vertex `v` on the reference cell
pub fn reference_vertex(dim: usize, v: usize) -> DVector<f64> {
    DVector::from_fn(dim, |d, _| ((v >> d) & 1) as f64)
}

/// Outward unit normal of `local_face` on the reference cell
pub fn reference_face_normal(dim: usize, local_face: usize) -> DVector<f64> {
    let (d, s) = (local_face / 2, local_face % 2);
    let mut normal = DVector::zeros(dim);
    normal[d] = if s == 1 { 1.0 } else { -1.0 };
    normal
}

/// Map a point given in the `dim - 1` coordinates of `local_face` onto the reference cell
///
/// Face coordinates are the remaining cell coordinates in increasing order
pub fn embed_face_point(dim: usize, local_face: usize, face_point: &[f64]) -> DVector<f64> {
    let (d, s) = (local_face / 2, local_face % 2);
    let mut face_coords = face_point.iter();
    DVector::from_fn(dim, |e, _| {
        if e == d {
            s as f64
        } else {
            face_coords.next().copied().unwrap_or(0.0)
        }
    })
}
