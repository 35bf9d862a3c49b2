use super::dof::DofHandler;
use super::mapping::{CellMapping, MappingCache};
use crate::error::{FieldError, MeshError, Result};
use crate::interpolation::VectorFunction;

use nalgebra::DVector;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Slack allowed around the reference cell when deciding whether a point lies in a cell
pub const LOCATE_TOLERANCE: f64 = 1e-10;

/// A finite element field over a mesh: a coefficient per dof, reconstructed through the dofs' local basis
///
/// Evaluation first locates the cell containing a point. The cell found by the previous successful search
/// is tried first, so evaluating nearby points in sequence is cheap.
pub struct FieldEvaluator<'a> {
    dofs: &'a DofHandler,
    mappings: &'a MappingCache<'a>,
    coefficients: Vec<f64>,
    hint: AtomicUsize,
}

impl<'a> FieldEvaluator<'a> {
    pub fn new(
        dofs: &'a DofHandler,
        mappings: &'a MappingCache<'a>,
        coefficients: Vec<f64>,
    ) -> Result<Self> {
        check_same_mesh(dofs, mappings)?;
        if coefficients.len() != dofs.n_dofs() {
            return Err(FieldError::CoefficientLengthMismatch {
                expected: dofs.n_dofs(),
                found: coefficients.len(),
            }
            .into());
        }

        Ok(Self {
            dofs,
            mappings,
            coefficients,
            hint: AtomicUsize::new(0),
        })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Find a cell containing `point` and the reference coordinates of `point` within it
    ///
    /// On a face shared by two cells either cell may be returned
    pub fn locate(&self, point: &DVector<f64>) -> Result<(usize, DVector<f64>)> {
        let dim = self.mappings.mesh().dim();
        if point.len() != dim {
            return Err(MeshError::PointDimension {
                expected: dim,
                found: point.len(),
            }
            .into());
        }

        let n_cells = self.mappings.len();
        let hint = self.hint.load(Ordering::Relaxed);
        let candidates = std::iter::once(hint)
            .filter(|cell| *cell < n_cells)
            .chain((0..n_cells).filter(|cell| *cell != hint));

        let mut not_converged = None;
        for cell in candidates {
            let mapping = self.mappings.cell(cell);
            if !mapping.may_contain(point) {
                continue;
            }

            match mapping.inverse_transform(point) {
                Ok(ref_point) => {
                    if CellMapping::contains(&ref_point, LOCATE_TOLERANCE) {
                        self.hint.store(cell, Ordering::Relaxed);
                        return Ok((cell, ref_point));
                    }
                }
                Err(err) => {
                    not_converged.get_or_insert(err);
                }
            }
        }

        match not_converged {
            Some(err) => {
                log::warn!("no cell contains {:?}; inverse mapping failed: {}", point.as_slice(), err);
                Err(err.into())
            }
            None => Err(FieldError::PointOutsideDomain(point.iter().copied().collect()).into()),
        }
    }

    /// Value of the field at a point in real space
    pub fn evaluate(&self, point: &DVector<f64>) -> Result<DVector<f64>> {
        let (cell, ref_point) = self.locate(point)?;
        Ok(self.evaluate_in_cell(cell, &ref_point))
    }

    /// Value of the field restricted to `cell`, at a point given in that cell's reference coordinates
    pub fn evaluate_in_cell(&self, cell: usize, ref_point: &DVector<f64>) -> DVector<f64> {
        let element = self.dofs.element();
        let mapping = self.mappings.cell(cell);
        let signs = self.dofs.sign_table();

        self.dofs.cell_dofs(cell).iter().enumerate().fold(
            DVector::zeros(element.n_components()),
            |acc, (local_index, dof)| {
                let weight = signs.sign(cell, local_index) * self.coefficients[*dof];
                if weight == 0.0 {
                    acc
                } else {
                    acc + element.physical_basis_value(local_index, ref_point, mapping) * weight
                }
            },
        )
    }
}

/// Fails unless `dofs` and `mappings` describe meshes with the same number of cells and the same dimension
pub(crate) fn check_same_mesh(
    dofs: &DofHandler,
    mappings: &MappingCache,
) -> std::result::Result<(), FieldError> {
    let (dof_cells, dof_dim) = (dofs.n_cells(), dofs.element().dim());
    let (mapping_cells, mapping_dim) = (mappings.len(), mappings.mesh().dim());
    if dof_cells == mapping_cells && dof_dim == mapping_dim {
        Ok(())
    } else {
        Err(FieldError::MeshMismatch {
            dof_cells,
            dof_dim,
            mapping_cells,
            mapping_dim,
        })
    }
}

impl VectorFunction for FieldEvaluator<'_> {
    fn n_components(&self) -> usize {
        self.dofs.element().n_components()
    }

    fn vector_value(&self, point: &DVector<f64>) -> Result<DVector<f64>> {
        self.evaluate(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::FiniteElement;
    use crate::error::FemError;
    use crate::domain::mapping::{MappingQ, PointMap};
    use crate::domain::mesh::cell::embed_face_point;
    use crate::domain::mesh::Mesh;
    use crate::interpolation::{interpolate, FnFunction};
    use std::sync::Arc;

    fn refined_square() -> Mesh {
        let mut mesh = Mesh::hyper_cube(2, -0.3, 0.7).unwrap();
        mesh.refine_global(2).unwrap();
        mesh
    }

    #[test]
    fn locate_points() {
        let mesh = refined_square();
        let mappings = MappingCache::new(&mesh, &MappingQ::new(1).unwrap()).unwrap();
        let dofs = DofHandler::distribute(&mesh, &FiniteElement::raviart_thomas(2, 0).unwrap()).unwrap();
        let field = FieldEvaluator::new(&dofs, &mappings, vec![0.0; dofs.n_dofs()]).unwrap();

        // upper right cell of the lower left quadrant
        let (cell, ref_point) = field.locate(&DVector::from_vec(vec![0.0, 0.1])).unwrap();
        assert_eq!(cell, 3);
        assert!((ref_point[0] - 0.2).abs() < 1e-12);
        assert!((ref_point[1] - 0.6).abs() < 1e-12);

        // the hint makes a second lookup in the same cell start there
        assert_eq!(field.hint.load(Ordering::Relaxed), 3);
        assert_eq!(field.locate(&DVector::from_vec(vec![-0.01, 0.19])).unwrap().0, 3);

        // domain corners are inside
        assert!(field.locate(&DVector::from_vec(vec![0.7, 0.7])).is_ok());
        assert!(field.locate(&DVector::from_vec(vec![-0.3, -0.3])).is_ok());
    }

    #[test]
    fn points_outside_the_mesh() {
        let mesh = refined_square();
        let mappings = MappingCache::new(&mesh, &MappingQ::new(2).unwrap()).unwrap();
        let dofs = DofHandler::distribute(&mesh, &FiniteElement::raviart_thomas(2, 1).unwrap()).unwrap();
        let field = FieldEvaluator::new(&dofs, &mappings, vec![1.0; dofs.n_dofs()]).unwrap();

        for outside in [vec![0.71, 0.2], vec![2.0, 2.0], vec![-0.3 - 1e-6, 0.0]] {
            assert!(matches!(
                field.evaluate(&DVector::from_vec(outside)),
                Err(FemError::Field(FieldError::PointOutsideDomain(_)))
            ));
        }

        assert!(matches!(
            field.evaluate(&DVector::from_vec(vec![0.0, 0.0, 0.0])),
            Err(FemError::Mesh(MeshError::PointDimension { expected: 2, found: 3 }))
        ));
    }

    #[test]
    fn coefficient_length() {
        let mesh = refined_square();
        let mappings = MappingCache::new(&mesh, &MappingQ::new(1).unwrap()).unwrap();
        let dofs = DofHandler::distribute(&mesh, &FiniteElement::lagrange(2, 1).unwrap()).unwrap();

        assert!(matches!(
            FieldEvaluator::new(&dofs, &mappings, vec![0.0; 24]),
            Err(FemError::Field(FieldError::CoefficientLengthMismatch {
                expected: 25,
                found: 24
            }))
        ));
    }

    #[test]
    fn normal_component_is_continuous() {
        let mut mesh = refined_square();
        mesh.distort_random(0.1, 4).unwrap();
        let mappings = MappingCache::new(&mesh, &MappingQ::new(1).unwrap()).unwrap();
        let dofs = DofHandler::distribute(&mesh, &FiniteElement::raviart_thomas(2, 1).unwrap()).unwrap();

        let f = FnFunction::new(2, |p: &DVector<f64>| {
            DVector::from_vec(vec![(3.0 * p[1]).sin() + p[0], p[0] * p[0] - p[1]])
        });
        let field = FieldEvaluator::new(&dofs, &mappings, interpolate(&dofs, &mappings, &f).unwrap()).unwrap();

        for face in mesh.faces().filter(|face| !face.is_boundary()) {
            let [a, b] = [face.sides[0], face.sides[1]];
            let ref_a = embed_face_point(2, a.local_face, &[0.3]);
            let x = mappings.cell(a.cell).transform(&ref_a);
            let ref_b = mappings.cell(b.cell).inverse_transform(&x).unwrap();

            let normal = mappings.cell(a.cell).normal(a.local_face, &ref_a);
            let jump = (field.evaluate_in_cell(a.cell, &ref_a) - field.evaluate_in_cell(b.cell, &ref_b)).dot(&normal);
            assert!(jump.abs() < 1e-10);
        }
    }

    #[test]
    fn curved_cell_lookup() {
        // the top edge of the cell bulges upwards to y = 1 + 0.45 (x - 0.5)^2
        let mesh = Mesh::hyper_cube(2, 0.0, 1.0).unwrap();
        let bend: PointMap = Arc::new(|p: &DVector<f64>| {
            DVector::from_vec(vec![p[0], p[1] + 0.45 * p[1] * (p[0] - 0.5).powi(2)])
        });
        let mappings = MappingCache::new(&mesh, &MappingQ::with_deformation(2, bend).unwrap()).unwrap();
        let dofs = DofHandler::distribute(&mesh, &FiniteElement::lagrange(2, 1).unwrap()).unwrap();
        let field = FieldEvaluator::new(&dofs, &mappings, vec![1.0; 4]).unwrap();

        let value = field.evaluate(&DVector::from_vec(vec![0.5, 0.5])).unwrap();
        assert!((value[0] - 1.0).abs() < 1e-12);

        // above the straight cell, but below the curved edge
        let (_, ref_point) = field.locate(&DVector::from_vec(vec![0.0, 1.1])).unwrap();
        assert!((ref_point[1] - 1.1 / 1.1125).abs() < 1e-10);

        assert!(matches!(
            field.evaluate(&DVector::from_vec(vec![0.5, 1.05])),
            Err(FemError::Field(FieldError::PointOutsideDomain(_)))
        ));
    }

    #[test]
    fn dofs_and_mappings_from_different_meshes() {
        let coarse = Mesh::hyper_cube(2, -0.3, 0.7).unwrap();
        let fine = refined_square();
        let mappings = MappingCache::new(&coarse, &MappingQ::new(1).unwrap()).unwrap();
        let dofs = DofHandler::distribute(&fine, &FiniteElement::raviart_thomas(2, 0).unwrap()).unwrap();

        assert!(matches!(
            FieldEvaluator::new(&dofs, &mappings, vec![0.0; dofs.n_dofs()]),
            Err(FemError::Field(FieldError::MeshMismatch {
                dof_cells: 16,
                dof_dim: 2,
                mapping_cells: 1,
                mapping_dim: 2
            }))
        ));

        let cube = Mesh::hyper_cube(3, 0.0, 1.0).unwrap();
        let mappings_3d = MappingCache::new(&cube, &MappingQ::new(1).unwrap()).unwrap();
        let single = DofHandler::distribute(&coarse, &FiniteElement::lagrange(2, 1).unwrap()).unwrap();
        assert!(matches!(
            FieldEvaluator::new(&single, &mappings_3d, vec![0.0; 4]),
            Err(FemError::Field(FieldError::MeshMismatch { dof_dim: 2, mapping_dim: 3, .. }))
        ));
    }
}
