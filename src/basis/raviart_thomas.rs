use super::polynomials::{box_indices, shifted_legendre, MultiIndex};
use super::DofLoc;
use crate::domain::mapping::CellMapping;
use crate::domain::mesh::cell::{n_faces, reference_face_normal};
use crate::error::{ElementError, GeometryError};
use crate::integration::{FaceQuadrature, QuadratureRule};

use nalgebra::{DMatrix, DVector};

/// A vector polynomial `e_component * prod_d P_{degrees[d]}(x_d)` built from shifted Legendre polynomials
#[derive(Clone, Debug)]
struct VectorMonomial {
    component: usize,
    degrees: MultiIndex,
}

impl VectorMonomial {
    fn scalar(&self, x: &[f64]) -> f64 {
        self.degrees
            .iter()
            .zip(x.iter())
            .map(|(n, x_d)| shifted_legendre(*n, *x_d))
            .product()
    }
}

/// The functionals defining the Raviart-Thomas degrees of freedom
#[derive(Clone, Debug)]
enum Functional {
    /// `int_F (v . n) q` with `q` a Legendre product of `degrees` in the face coordinates
    FaceMoment { local_face: usize, degrees: MultiIndex },
    /// `int_K v_component q` with `q` a Legendre product of `degrees`
    InteriorMoment { component: usize, degrees: MultiIndex },
}

/// Normal-continuous (H(div) conforming) Raviart-Thomas element `RT_k` on the reference cell `[0, 1]^dim`
///
/// Component `d` of the local space holds polynomials of degree `k + 1` in `x_d` and `k` in the other
/// coordinates. The nodal basis is dual to the face-normal and interior moments; it is found by inverting
/// the matrix of those functionals applied to a Legendre basis of the local space.
#[derive(Clone, Debug)]
pub struct RaviartThomasElement {
    dim: usize,
    order: usize,
    raw_basis: Vec<VectorMonomial>,
    // basis function i is sum_j coefficients[(j, i)] * raw_basis[j]
    coefficients: DMatrix<f64>,
    functionals: Vec<Functional>,
    face_rules: Vec<FaceQuadrature>,
    interior_rule: QuadratureRule,
    sample_points: Vec<DVector<f64>>,
    locations: Vec<DofLoc>,
}

impl RaviartThomasElement {
    pub fn new(dim: usize, order: usize) -> Result<Self, ElementError> {
        if !(2..=3).contains(&dim) {
            return Err(ElementError::UnsupportedDimension(dim));
        }
        let k = order;
        let n_quad = k + 2;

        let raw_basis: Vec<VectorMonomial> = (0..dim)
            .flat_map(|component| {
                let extents: MultiIndex = (0..dim)
                    .map(|d| if d == component { k + 2 } else { k + 1 })
                    .collect();
                box_indices(&extents)
                    .map(|degrees| VectorMonomial { component, degrees })
                    .collect::<Vec<_>>()
            })
            .collect();

        let face_extents: MultiIndex = (0..dim - 1).map(|_| k + 1).collect();
        let face_functionals = (0..n_faces(dim)).flat_map(|local_face| {
            box_indices(&face_extents)
                .map(|degrees| Functional::FaceMoment { local_face, degrees })
                .collect::<Vec<_>>()
        });
        let interior_functionals = (0..dim).flat_map(|component| {
            let extents: MultiIndex = (0..dim)
                .map(|d| if d == component { k } else { k + 1 })
                .collect();
            box_indices(&extents)
                .map(|degrees| Functional::InteriorMoment { component, degrees })
                .collect::<Vec<_>>()
        });
        let functionals: Vec<Functional> = face_functionals.chain(interior_functionals).collect();

        let locations = functionals
            .iter()
            .scan(0, |face_index, functional| {
                Some(match functional {
                    Functional::FaceMoment { local_face, .. } => {
                        let loc = DofLoc::Face {
                            local_face: *local_face,
                            index: *face_index % face_moment_count(dim, k),
                        };
                        *face_index += 1;
                        loc
                    }
                    Functional::InteriorMoment { .. } => DofLoc::Cell,
                })
            })
            .collect();

        let face_rules: Vec<FaceQuadrature> = (0..n_faces(dim))
            .map(|local_face| FaceQuadrature::gauss(dim, n_quad, local_face))
            .collect();
        let interior_rule = QuadratureRule::gauss(dim, n_quad);
        let sample_points = face_rules
            .iter()
            .flat_map(|rule| rule.cell_points.iter().cloned())
            .chain(interior_rule.points.iter().cloned())
            .collect();

        let mut element = Self {
            dim,
            order,
            raw_basis,
            coefficients: DMatrix::identity(0, 0),
            functionals,
            face_rules,
            interior_rule,
            sample_points,
            locations,
        };

        // node matrix: functional i applied to raw basis function j
        let n = element.raw_basis.len();
        debug_assert_eq!(n, element.functionals.len());
        let mut node_matrix = DMatrix::zeros(n, n);
        for (j, raw) in element.raw_basis.iter().enumerate() {
            let samples: Vec<DVector<f64>> = element
                .sample_points
                .iter()
                .map(|x| raw_value(dim, raw, x))
                .collect();
            for i in 0..n {
                node_matrix[(i, j)] = element.reference_functional(i, &samples);
            }
        }

        element.coefficients = node_matrix
            .try_inverse()
            .ok_or_else(|| ElementError::SingularNodeMatrix(element.name()))?;

        Ok(element)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn name(&self) -> String {
        format!("RaviartThomas<{}>({})", self.dim, self.order)
    }

    pub fn n_local_dofs(&self) -> usize {
        self.functionals.len()
    }

    pub fn dof_locations(&self) -> &[DofLoc] {
        &self.locations
    }

    /// Face quadrature points (face by face), followed by the interior quadrature points
    pub fn sample_points(&self) -> &[DVector<f64>] {
        &self.sample_points
    }

    pub fn basis_value(&self, local_index: usize, ref_point: &DVector<f64>) -> DVector<f64> {
        let mut value = DVector::zeros(self.dim);
        for (j, raw) in self.raw_basis.iter().enumerate() {
            let c = self.coefficients[(j, local_index)];
            if c != 0.0 {
                value[raw.component] += c * raw.scalar(ref_point.as_slice());
            }
        }
        value
    }

    /// Contravariant Piola transform of a basis function: `J v / det(J)`
    pub fn physical_basis_value(
        &self,
        local_index: usize,
        ref_point: &DVector<f64>,
        mapping: &CellMapping,
    ) -> DVector<f64> {
        let jac = mapping.jacobian(ref_point);
        let det = jac.determinant();
        (jac * self.basis_value(local_index, ref_point)) / det
    }

    /// Apply the functional of `local_index` to a function sampled (in real space) at the mapped sample points
    pub fn local_functional(
        &self,
        local_index: usize,
        samples: &[DVector<f64>],
        mapping: &CellMapping,
    ) -> Result<f64, GeometryError> {
        match &self.functionals[local_index] {
            Functional::FaceMoment { local_face, degrees } => {
                let rule = &self.face_rules[*local_face];
                let offset = self.face_offset(*local_face);
                Ok(rule
                    .face
                    .iter()
                    .zip(rule.cell_points.iter())
                    .enumerate()
                    .map(|(q, ((face_point, w), cell_point))| {
                        let normal = mapping.scaled_normal(*local_face, cell_point);
                        w * normal.dot(&samples[offset + q]) * legendre_product(degrees, face_point)
                    })
                    .sum())
            }
            Functional::InteriorMoment { component, degrees } => {
                let offset = self.interior_offset();
                self.interior_rule
                    .iter()
                    .enumerate()
                    .map(|(q, (x, w))| -> Result<f64, GeometryError> {
                        let pulled_back = piola_pullback(mapping, x, &samples[offset + q])?;
                        Ok(w * pulled_back[*component] * legendre_product(degrees, x))
                    })
                    .sum()
            }
        }
    }

    /// All local functionals at once; equal to calling [Self::local_functional] for every index
    ///
    /// Fails if the cell's Jacobian degenerates at any sample point
    pub fn local_functionals(
        &self,
        samples: &[DVector<f64>],
        mapping: &CellMapping,
    ) -> Result<Vec<f64>, GeometryError> {
        // transform every sample back to the reference cell once
        let pulled_back = self
            .sample_points
            .iter()
            .zip(samples.iter())
            .map(|(x, value)| piola_pullback(mapping, x, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((0..self.n_local_dofs())
            .map(|i| self.reference_functional(i, &pulled_back))
            .collect())
    }

    // functional i applied to a reference-space vector field sampled at the sample points
    fn reference_functional(&self, local_index: usize, samples: &[DVector<f64>]) -> f64 {
        match &self.functionals[local_index] {
            Functional::FaceMoment { local_face, degrees } => {
                let rule = &self.face_rules[*local_face];
                let offset = self.face_offset(*local_face);
                let normal = reference_face_normal(self.dim, *local_face);
                rule.face
                    .iter()
                    .enumerate()
                    .map(|(q, (face_point, w))| {
                        w * normal.dot(&samples[offset + q]) * legendre_product(degrees, face_point)
                    })
                    .sum()
            }
            Functional::InteriorMoment { component, degrees } => {
                let offset = self.interior_offset();
                self.interior_rule
                    .iter()
                    .enumerate()
                    .map(|(q, (x, w))| w * samples[offset + q][*component] * legendre_product(degrees, x))
                    .sum()
            }
        }
    }

    fn face_offset(&self, local_face: usize) -> usize {
        local_face * self.face_rules[0].face.len()
    }

    fn interior_offset(&self) -> usize {
        self.face_rules.len() * self.face_rules[0].face.len()
    }
}

fn face_moment_count(dim: usize, order: usize) -> usize {
    (order + 1).pow(dim as u32 - 1)
}

fn raw_value(dim: usize, raw: &VectorMonomial, x: &DVector<f64>) -> DVector<f64> {
    let mut value = DVector::zeros(dim);
    value[raw.component] = raw.scalar(x.as_slice());
    value
}

fn legendre_product(degrees: &[usize], x: &DVector<f64>) -> f64 {
    degrees
        .iter()
        .zip(x.iter())
        .map(|(n, x_d)| shifted_legendre(*n, *x_d))
        .product()
}

/// Inverse contravariant Piola transform: `det(J) J^-1 v`
fn piola_pullback(
    mapping: &CellMapping,
    ref_point: &DVector<f64>,
    value: &DVector<f64>,
) -> Result<DVector<f64>, GeometryError> {
    let (jac, det) = mapping.checked_jacobian(ref_point)?;
    jac.lu()
        .solve(value)
        .map(|solved| solved * det)
        .ok_or(GeometryError::DegenerateGeometry {
            cell: mapping.cell,
            det,
        })
}
