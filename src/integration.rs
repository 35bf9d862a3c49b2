/// Methods to assist in Gauss-Legendre-Quadrature integration
pub mod glq;

use crate::basis::polynomials::tensor_indices;
use crate::domain::mesh::cell::embed_face_point;
use glq::unit_gauss_points;
use nalgebra::DVector;

/// A set of points and weights over the unit hypercube `[0, 1]^dim`
#[derive(Clone, Debug)]
pub struct QuadratureRule {
    pub points: Vec<DVector<f64>>,
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// Tensor product Gauss-Legendre rule with `n` points per direction
    ///
    /// Exact for polynomials of degree `2n - 1` in each coordinate
    pub fn gauss(dim: usize, n: usize) -> Self {
        let (points_1d, weights_1d) = unit_gauss_points(n);

        let (points, weights) = tensor_indices(dim, n)
            .map(|idx| {
                (
                    DVector::from_iterator(dim, idx.iter().map(|i| points_1d[*i])),
                    idx.iter().map(|i| weights_1d[*i]).product::<f64>(),
                )
            })
            .unzip();

        Self { points, weights }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DVector<f64>, f64)> + '_ {
        self.points.iter().zip(self.weights.iter().copied())
    }
}

/// A Gauss rule on one face of the unit cell
///
/// `face` holds the points in the face's own `dim - 1` coordinates, `cell_points` the same
/// points embedded in the coordinates of the cell
#[derive(Clone, Debug)]
pub struct FaceQuadrature {
    pub local_face: usize,
    pub face: QuadratureRule,
    pub cell_points: Vec<DVector<f64>>,
}

impl FaceQuadrature {
    pub fn gauss(dim: usize, n: usize, local_face: usize) -> Self {
        let face = QuadratureRule::gauss(dim - 1, n);
        let cell_points = face
            .points
            .iter()
            .map(|fp| embed_face_point(dim, local_face, fp.as_slice()))
            .collect();

        Self {
            local_face,
            face,
            cell_points,
        }
    }
}
