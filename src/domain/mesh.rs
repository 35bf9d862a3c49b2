/// A hypercube cell: quadrilateral in 2D, hexahedron in 3D
pub mod cell;
/// Random perturbation of vertex positions
pub mod distortion;
/// The shared boundary between two cells
pub mod face;
/// Uniform (global) h-refinement
pub mod h_refinement;
/// A point in real space
pub mod vertex;

use super::mapping::{q1_jacobian, MIN_RELATIVE_JACOBIAN};
use crate::error::{GeometryError, MeshError};
use cell::{n_faces, n_vertices, Cell, CellVertices};
use face::{Face, FaceSide};
use vertex::Vertex;

use nalgebra::DVector;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Geometric cells, vertices and faces along with their adjacency
///
/// Cells, faces and vertices reference each other only through their indices into the flat
/// arrays held here.
#[derive(Debug, Clone)]
pub struct Mesh {
    dim: usize,
    pub vertices: Vec<Vertex>,
    pub cells: Vec<Cell>,
    pub faces: Vec<Face>,
}

impl Mesh {
    /// A single cell covering `[low, high]^dim`
    pub fn hyper_cube(dim: usize, low: f64, high: f64) -> Result<Self, MeshError> {
        Self::hyper_rectangle(&vec![low; dim], &vec![high; dim])
    }

    /// A single axis-aligned cell spanning the two corners `low` and `high`
    pub fn hyper_rectangle(low: &[f64], high: &[f64]) -> Result<Self, MeshError> {
        let dim = low.len();
        if high.len() != dim {
            return Err(MeshError::PointDimension {
                expected: dim,
                found: high.len(),
            });
        }
        check_dimension(dim)?;

        let points = (0..n_vertices(dim))
            .map(|v| {
                DVector::from_fn(dim, |d, _| if (v >> d) & 1 == 1 { high[d] } else { low[d] })
            })
            .collect();

        Self::from_cells(dim, points, vec![(0..n_vertices(dim)).collect()])
    }

    /// Construct a Mesh from a list of vertex positions and cells given by their vertex ids
    ///
    /// Cell vertices must follow the lexicographic layout described in [cell::Cell]
    pub fn from_cells(
        dim: usize,
        points: Vec<DVector<f64>>,
        cell_vertices: Vec<CellVertices>,
    ) -> Result<Self, MeshError> {
        check_dimension(dim)?;

        if let Some(bad) = points.iter().find(|p| p.len() != dim) {
            return Err(MeshError::PointDimension {
                expected: dim,
                found: bad.len(),
            });
        }

        let cells = cell_vertices
            .into_iter()
            .enumerate()
            .map(|(id, vertices)| {
                if vertices.len() != n_vertices(dim) {
                    Err(MeshError::InvalidCell {
                        cell: id,
                        reason: format!(
                            "expected {} vertices, found {}",
                            n_vertices(dim),
                            vertices.len()
                        ),
                    })
                } else if let Some(v) = vertices.iter().find(|v| **v >= points.len()) {
                    Err(MeshError::InvalidCell {
                        cell: id,
                        reason: format!("vertex {} does not exist", v),
                    })
                } else {
                    Ok(Cell::new(id, vertices, 0))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        check_cell_geometry(dim, &points, &cells)?;

        let mut mesh = Self {
            dim,
            vertices: points
                .into_iter()
                .enumerate()
                .map(|(id, coords)| Vertex::new(id, coords))
                .collect(),
            cells,
            faces: Vec::new(),
        };
        mesh.build_faces()?;

        Ok(mesh)
    }

    // ----------------------------------------------------------------------------------------------------
    // General Data Retrieval
    // ----------------------------------------------------------------------------------------------------

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// Iterate over all `Cell`s in the mesh
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter()
    }

    /// Iterate over all `Face`s in the mesh
    pub fn faces(&self) -> impl Iterator<Item = &Face> + '_ {
        self.faces.iter()
    }

    pub fn vertex(&self, vertex_id: usize) -> &DVector<f64> {
        &self.vertices[vertex_id].coords
    }

    /// Get the positions of the vertices composing a [`Cell`], in local order
    pub fn cell_vertices(&self, cell_id: usize) -> Vec<&DVector<f64>> {
        self.cells[cell_id]
            .vertices
            .iter()
            .map(|v| &self.vertices[*v].coords)
            .collect()
    }

    /// Largest distance between two vertices of a [`Cell`]
    pub fn cell_diameter(&self, cell_id: usize) -> f64 {
        diameter(&self.cell_vertices(cell_id))
    }

    /// Smallest and largest corner of the axis-aligned box containing every vertex
    pub fn bounding_box(&self) -> [DVector<f64>; 2] {
        bounding_box(self.dim, self.vertices.iter().map(|v| &v.coords))
    }

    // ----------------------------------------------------------------------------------------------------
    // Topology
    // ----------------------------------------------------------------------------------------------------

    // Derive faces from the cells, recording each cell's side and the boundary vertices
    fn build_faces(&mut self) -> Result<(), MeshError> {
        let dim = self.dim;
        let mut face_ids: BTreeMap<SmallVec<[usize; 4]>, usize> = BTreeMap::new();
        let mut faces: Vec<Face> = Vec::new();

        for cell in self.cells.iter_mut() {
            cell.faces.clear();
            for local_face in 0..n_faces(dim) {
                let vertices = cell.face_vertices(dim, local_face);
                let mut key = vertices.clone();
                key.sort_unstable();

                let face_id = match face_ids.get(&key) {
                    Some(&face_id) => {
                        let face = &mut faces[face_id];
                        if face.sides.len() >= 2 {
                            return Err(MeshError::NonManifoldFace(key.to_vec()));
                        }
                        face.sides.push(FaceSide {
                            cell: cell.id,
                            local_face,
                            orientation: false,
                        });
                        face_id
                    }
                    None => {
                        let face_id = faces.len();
                        faces.push(Face::new(
                            face_id,
                            vertices,
                            FaceSide {
                                cell: cell.id,
                                local_face,
                                orientation: true,
                            },
                        ));
                        face_ids.insert(key, face_id);
                        face_id
                    }
                };
                cell.faces.push(face_id);
            }
        }

        for vertex in self.vertices.iter_mut() {
            vertex.boundary = false;
        }
        for face in faces.iter().filter(|f| f.is_boundary()) {
            for v in face.vertices.iter() {
                self.vertices[*v].boundary = true;
            }
        }

        self.faces = faces;
        Ok(())
    }
}

fn check_dimension(dim: usize) -> Result<(), MeshError> {
    if dim == 2 || dim == 3 {
        Ok(())
    } else {
        Err(MeshError::UnsupportedDimension(dim))
    }
}

pub(crate) fn diameter(points: &[&DVector<f64>]) -> f64 {
    let mut max: f64 = 0.0;
    for (a, pa) in points.iter().enumerate() {
        for pb in points.iter().skip(a + 1) {
            max = max.max((*pa - *pb).norm());
        }
    }
    max
}

pub(crate) fn bounding_box<'a>(
    dim: usize,
    points: impl Iterator<Item = &'a DVector<f64>>,
) -> [DVector<f64>; 2] {
    points.fold(
        [
            DVector::from_element(dim, f64::INFINITY),
            DVector::from_element(dim, f64::NEG_INFINITY),
        ],
        |[min, max], p| [min.inf(p), max.sup(p)],
    )
}

/// Check that every cell's multilinear map keeps a positive Jacobian at its corners and centre
pub(crate) fn check_cell_geometry(
    dim: usize,
    points: &[DVector<f64>],
    cells: &[Cell],
) -> Result<(), GeometryError> {
    let centre = DVector::from_element(dim, 0.5);

    for cell in cells {
        let corners: Vec<&DVector<f64>> = cell.vertices.iter().map(|v| &points[*v]).collect();
        let floor = MIN_RELATIVE_JACOBIAN * diameter(&corners).powi(dim as i32);

        let samples = (0..n_vertices(dim))
            .map(|v| cell::reference_vertex(dim, v))
            .chain(std::iter::once(centre.clone()));

        for ref_point in samples {
            let det = q1_jacobian(&corners, &ref_point).determinant();
            if !(det > floor) {
                return Err(GeometryError::DegenerateGeometry { cell: cell.id, det });
            }
        }
    }

    Ok(())
}
