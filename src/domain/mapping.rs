use super::mesh::cell::{n_vertices, reference_vertex};
use super::mesh::{bounding_box, diameter, Mesh};
use crate::basis::polynomials::{lagrange_tensor, lagrange_tensor_d1, tensor_indices, MultiIndex};
use crate::error::GeometryError;
use crate::integration::QuadratureRule;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Maximum number of Newton steps taken by [CellMapping::inverse_transform]
pub const MAX_NEWTON_ITERATIONS: usize = 30;

/// Newton convergence tolerance, relative to the cell diameter
pub const NEWTON_TOLERANCE: f64 = 1e-12;

/// Jacobian determinants below this fraction of `diameter^dim` are treated as degenerate
pub const MIN_RELATIVE_JACOBIAN: f64 = 1e-10;

/// A smooth map applied to every mapping support point (used to describe curved geometry)
pub type PointMap = Arc<dyn Fn(&DVector<f64>) -> DVector<f64> + Send + Sync>;

/// Isoparametric mapping of polynomial degree `order` between the reference cell `[0, 1]^dim` and real space
#[derive(Clone)]
pub struct MappingQ {
    order: usize,
    deformation: Option<PointMap>,
}

impl MappingQ {
    /// A mapping whose support points are interpolated from the cell's vertices
    pub fn new(order: usize) -> Result<Self, GeometryError> {
        if order == 0 {
            Err(GeometryError::InvalidMappingOrder(order))
        } else {
            Ok(Self {
                order,
                deformation: None,
            })
        }
    }

    /// A mapping whose support points are additionally moved by `deformation`, producing curved cells
    pub fn with_deformation(order: usize, deformation: PointMap) -> Result<Self, GeometryError> {
        let mut mapping = Self::new(order)?;
        mapping.deformation = Some(deformation);
        Ok(mapping)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Build the mapping record of one cell
    pub fn build(&self, mesh: &Mesh, cell_id: usize) -> Result<CellMapping, GeometryError> {
        let dim = mesh.dim();
        let corners = mesh.cell_vertices(cell_id);

        let support_points: Vec<DVector<f64>> = tensor_indices(dim, self.order + 1)
            .map(|t| {
                let ref_point = DVector::from_iterator(
                    dim,
                    t.iter().map(|t_d| *t_d as f64 / self.order as f64),
                );
                let flat = q1_transform(&corners, &ref_point);
                match &self.deformation {
                    Some(deformation) => deformation(&flat),
                    None => flat,
                }
            })
            .collect();

        let cell_mapping = CellMapping::new(cell_id, dim, self.order, support_points);
        cell_mapping.check_jacobian()?;
        Ok(cell_mapping)
    }
}

impl fmt::Debug for MappingQ {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MappingQ")
            .field("order", &self.order)
            .field("curved", &self.deformation.is_some())
            .finish()
    }
}

/// The polynomial map of a single cell, stored as its support points on the `Q_order` lattice
#[derive(Clone, Debug)]
pub struct CellMapping {
    pub cell: usize,
    dim: usize,
    order: usize,
    lattice: Vec<MultiIndex>,
    support_points: Vec<DVector<f64>>,
    diameter: f64,
    bounds: [DVector<f64>; 2],
}

impl CellMapping {
    pub(crate) fn new(cell: usize, dim: usize, order: usize, support_points: Vec<DVector<f64>>) -> Self {
        let lattice: Vec<MultiIndex> = tensor_indices(dim, order + 1).collect();
        let diameter = diameter(&support_points.iter().collect::<Vec<_>>());

        // Lagrange maps can bulge past the hull of their support points
        let [min, max] = bounding_box(dim, support_points.iter());
        let pad = DVector::from_element(dim, 0.1 * diameter);
        let bounds = [min - &pad, max + &pad];

        Self {
            cell,
            dim,
            order,
            lattice,
            support_points,
            diameter,
            bounds,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn support_points(&self) -> &[DVector<f64>] {
        &self.support_points
    }

    /// Map a point from the reference cell into real space
    pub fn transform(&self, ref_point: &DVector<f64>) -> DVector<f64> {
        self.lattice
            .iter()
            .zip(self.support_points.iter())
            .fold(DVector::zeros(self.dim), |acc, (t, x_t)| {
                acc + x_t * lagrange_tensor(self.order, t, ref_point.as_slice())
            })
    }

    /// `J[a][b] = d x_a / d x_ref_b`
    pub fn jacobian(&self, ref_point: &DVector<f64>) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(self.dim, self.dim);
        for (t, x_t) in self.lattice.iter().zip(self.support_points.iter()) {
            for b in 0..self.dim {
                let dl = lagrange_tensor_d1(self.order, t, ref_point.as_slice(), b);
                for a in 0..self.dim {
                    jac[(a, b)] += x_t[a] * dl;
                }
            }
        }
        jac
    }

    /// Recover reference coordinates of a point in real space with a bounded Newton iteration
    ///
    /// The returned point may lie outside the reference cell if `point` is not inside this cell
    pub fn inverse_transform(&self, point: &DVector<f64>) -> Result<DVector<f64>, GeometryError> {
        let tolerance = NEWTON_TOLERANCE * self.diameter;
        let mut ref_point = DVector::from_element(self.dim, 0.5);
        let mut residual = f64::INFINITY;

        for _ in 0..MAX_NEWTON_ITERATIONS {
            let delta = self.transform(&ref_point) - point;
            residual = delta.norm();
            if residual < tolerance {
                return Ok(ref_point);
            }

            let step = match self.jacobian(&ref_point).lu().solve(&delta) {
                Some(step) => step,
                None => break,
            };
            ref_point -= step;

            // diverging far outside the reference cell
            if ref_point.amax() > 1e3 || !ref_point.iter().all(|x| x.is_finite()) {
                break;
            }
        }

        Err(GeometryError::InverseMapDidNotConverge {
            cell: self.cell,
            iterations: MAX_NEWTON_ITERATIONS,
            residual,
        })
    }

    /// Area-weighted outward normal of `local_face`: `det(J) J^-T n_ref`
    ///
    /// Its length is the ratio between the physical and reference face measure
    pub fn scaled_normal(&self, local_face: usize, ref_point: &DVector<f64>) -> DVector<f64> {
        let (d, s) = (local_face / 2, local_face % 2);
        let jac = self.jacobian(ref_point);
        let column = cofactor_column(&jac, d);
        if s == 1 {
            column
        } else {
            -column
        }
    }

    /// Unit outward normal of `local_face` in real space
    pub fn normal(&self, local_face: usize, ref_point: &DVector<f64>) -> DVector<f64> {
        self.scaled_normal(local_face, ref_point).normalize()
    }

    /// Whether a reference point lies inside `[0, 1]^dim` up to `tolerance`
    pub fn contains(ref_point: &DVector<f64>, tolerance: f64) -> bool {
        ref_point
            .iter()
            .all(|x| *x >= -tolerance && *x <= 1.0 + tolerance)
    }

    /// Whether a real space point lies within the padded bounding box of this cell's support points
    pub fn may_contain(&self, point: &DVector<f64>) -> bool {
        point
            .iter()
            .enumerate()
            .all(|(d, x)| *x >= self.bounds[0][d] && *x <= self.bounds[1][d])
    }

    /// The Jacobian at `ref_point` and its determinant
    ///
    /// Fails with [GeometryError::DegenerateGeometry] when the determinant is not above the floor used when the
    /// mapping was built
    pub fn checked_jacobian(&self, ref_point: &DVector<f64>) -> Result<(DMatrix<f64>, f64), GeometryError> {
        let floor = MIN_RELATIVE_JACOBIAN * self.diameter.powi(self.dim as i32);
        let jac = self.jacobian(ref_point);
        let det = jac.determinant();
        if det > floor {
            Ok((jac, det))
        } else {
            Err(GeometryError::DegenerateGeometry {
                cell: self.cell,
                det,
            })
        }
    }

    // the determinant must stay positive on the whole cell; sample it on a Gauss grid and at the corners
    fn check_jacobian(&self) -> Result<(), GeometryError> {
        let interior = QuadratureRule::gauss(self.dim, self.order + 1);
        let corners = (0..n_vertices(self.dim)).map(|v| reference_vertex(self.dim, v));

        for ref_point in interior.points.into_iter().chain(corners) {
            self.checked_jacobian(&ref_point)?;
        }
        Ok(())
    }
}

/// Column `d` of the cofactor matrix `det(J) J^-T`
fn cofactor_column(jac: &DMatrix<f64>, d: usize) -> DVector<f64> {
    match jac.nrows() {
        2 => match d {
            0 => DVector::from_vec(vec![jac[(1, 1)], -jac[(0, 1)]]),
            _ => DVector::from_vec(vec![-jac[(1, 0)], jac[(0, 0)]]),
        },
        _ => {
            let (u, v) = (jac.column((d + 1) % 3), jac.column((d + 2) % 3));
            DVector::from_vec(vec![
                u[1] * v[2] - u[2] * v[1],
                u[2] * v[0] - u[0] * v[2],
                u[0] * v[1] - u[1] * v[0],
            ])
        }
    }
}

/// Multilinear map through the corners of a cell
pub(crate) fn q1_transform(corners: &[&DVector<f64>], ref_point: &DVector<f64>) -> DVector<f64> {
    let dim = ref_point.len();
    corners
        .iter()
        .enumerate()
        .fold(DVector::zeros(dim), |acc, (v, x_v)| {
            acc + *x_v * lagrange_tensor(1, &vertex_bits(dim, v), ref_point.as_slice())
        })
}

/// Jacobian of [q1_transform]
pub(crate) fn q1_jacobian(corners: &[&DVector<f64>], ref_point: &DVector<f64>) -> DMatrix<f64> {
    let dim = ref_point.len();
    let mut jac = DMatrix::zeros(dim, dim);
    for (v, x_v) in corners.iter().enumerate() {
        let bits = vertex_bits(dim, v);
        for b in 0..dim {
            let dn = lagrange_tensor_d1(1, &bits, ref_point.as_slice(), b);
            for a in 0..dim {
                jac[(a, b)] += x_v[a] * dn;
            }
        }
    }
    jac
}

fn vertex_bits(dim: usize, v: usize) -> MultiIndex {
    (0..dim).map(|d| (v >> d) & 1).collect()
}

/// Mapping records for every cell of a mesh, built once and read-only afterwards
///
/// Borrowing the mesh keeps it frozen (no refinement or distortion) for as long as the records exist
pub struct MappingCache<'m> {
    mesh: &'m Mesh,
    mapping: MappingQ,
    cells: Vec<CellMapping>,
}

impl<'m> MappingCache<'m> {
    /// Build the mapping of every cell in parallel. Fails on the first degenerate cell
    pub fn new(mesh: &'m Mesh, mapping: &MappingQ) -> Result<Self, GeometryError> {
        let cells = (0..mesh.n_cells())
            .into_par_iter()
            .map(|cell_id| mapping.build(mesh, cell_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            mesh,
            mapping: mapping.clone(),
            cells,
        })
    }

    pub fn mesh(&self) -> &'m Mesh {
        self.mesh
    }

    pub fn mapping(&self) -> &MappingQ {
        &self.mapping
    }

    pub fn cell(&self, cell_id: usize) -> &CellMapping {
        &self.cells[cell_id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellMapping> + '_ {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
