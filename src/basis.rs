/// Scalar tensor-product Lagrange elements
pub mod lagrange;
/// 1D polynomial families and multi-index helpers
pub mod polynomials;
/// Normal-continuous Raviart-Thomas elements
pub mod raviart_thomas;

use crate::domain::mapping::CellMapping;
use crate::error::{ElementError, GeometryError};
use lagrange::LagrangeElement;
use polynomials::MultiIndex;
use raviart_thomas::RaviartThomasElement;

use nalgebra::DVector;
use std::fmt;

/// The kind of functional that defines an element's degrees of freedom
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionalKind {
    /// Values at support points
    PointEvaluation,
    /// Normal flux moments on faces, plus interior moments
    FaceNormalMoment,
}

/// The topological entity a local degree of freedom is attached to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DofLoc {
    /// Interior to the cell; never shared
    Cell,
    /// The `index`-th moment on `local_face`; shared with the neighbour across that face
    Face { local_face: usize, index: usize },
    /// A support point on the `Q_k` lattice; shared with every cell touching that point
    Lattice(MultiIndex),
}

/// A finite element on the reference cell `[0, 1]^dim`
#[derive(Clone, Debug)]
pub enum FiniteElement {
    Lagrange(LagrangeElement),
    RaviartThomas(RaviartThomasElement),
}

impl FiniteElement {
    /// Scalar `Q_order` element (`order >= 1`)
    pub fn lagrange(dim: usize, order: usize) -> Result<Self, ElementError> {
        Ok(Self::Lagrange(LagrangeElement::new(dim, order)?))
    }

    /// `RT_order` element (`order >= 0`)
    pub fn raviart_thomas(dim: usize, order: usize) -> Result<Self, ElementError> {
        Ok(Self::RaviartThomas(RaviartThomasElement::new(dim, order)?))
    }

    pub fn dim(&self) -> usize {
        match self {
            Self::Lagrange(fe) => fe.dim(),
            Self::RaviartThomas(fe) => fe.dim(),
        }
    }

    pub fn order(&self) -> usize {
        match self {
            Self::Lagrange(fe) => fe.order(),
            Self::RaviartThomas(fe) => fe.order(),
        }
    }

    /// Number of components of the functions in the local space
    pub fn n_components(&self) -> usize {
        match self {
            Self::Lagrange(_) => 1,
            Self::RaviartThomas(fe) => fe.dim(),
        }
    }

    pub fn n_local_dofs(&self) -> usize {
        match self {
            Self::Lagrange(fe) => fe.n_local_dofs(),
            Self::RaviartThomas(fe) => fe.n_local_dofs(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Lagrange(fe) => format!("Lagrange<{}>({})", fe.dim(), fe.order()),
            Self::RaviartThomas(fe) => fe.name(),
        }
    }

    pub fn functional_kind(&self) -> FunctionalKind {
        match self {
            Self::Lagrange(_) => FunctionalKind::PointEvaluation,
            Self::RaviartThomas(_) => FunctionalKind::FaceNormalMoment,
        }
    }

    pub fn dof_locations(&self) -> &[DofLoc] {
        match self {
            Self::Lagrange(fe) => fe.dof_locations(),
            Self::RaviartThomas(fe) => fe.dof_locations(),
        }
    }

    /// Reference points where a function must be sampled to apply the local functionals
    pub fn sample_points(&self) -> &[DVector<f64>] {
        match self {
            Self::Lagrange(fe) => fe.sample_points(),
            Self::RaviartThomas(fe) => fe.sample_points(),
        }
    }

    /// Value of local basis function `local_index` on the reference cell
    pub fn basis_value(&self, local_index: usize, ref_point: &DVector<f64>) -> DVector<f64> {
        match self {
            Self::Lagrange(fe) => fe.basis_value(local_index, ref_point),
            Self::RaviartThomas(fe) => fe.basis_value(local_index, ref_point),
        }
    }

    /// Value of local basis function `local_index` in real space, at the image of `ref_point`
    pub fn physical_basis_value(
        &self,
        local_index: usize,
        ref_point: &DVector<f64>,
        mapping: &CellMapping,
    ) -> DVector<f64> {
        match self {
            Self::Lagrange(fe) => fe.basis_value(local_index, ref_point),
            Self::RaviartThomas(fe) => fe.physical_basis_value(local_index, ref_point, mapping),
        }
    }

    /// Apply local functional `local_index` to a function sampled at the images of [Self::sample_points]
    pub fn local_functional(
        &self,
        local_index: usize,
        samples: &[DVector<f64>],
        mapping: &CellMapping,
    ) -> Result<f64, GeometryError> {
        match self {
            Self::Lagrange(fe) => Ok(fe.local_functional(local_index, samples)),
            Self::RaviartThomas(fe) => fe.local_functional(local_index, samples, mapping),
        }
    }

    pub fn local_functionals(
        &self,
        samples: &[DVector<f64>],
        mapping: &CellMapping,
    ) -> Result<Vec<f64>, GeometryError> {
        match self {
            Self::Lagrange(fe) => Ok((0..fe.n_local_dofs())
                .map(|i| fe.local_functional(i, samples))
                .collect()),
            Self::RaviartThomas(fe) => fe.local_functionals(samples, mapping),
        }
    }
}

impl fmt::Display for FiniteElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mapping::MappingQ;
    use crate::domain::mesh::Mesh;

    #[test]
    fn capability_surface() {
        let rt = FiniteElement::raviart_thomas(2, 1).unwrap();
        assert_eq!(rt.name(), "RaviartThomas<2>(1)");
        assert_eq!(rt.n_components(), 2);
        assert_eq!(rt.n_local_dofs(), 12);
        assert_eq!(rt.functional_kind(), FunctionalKind::FaceNormalMoment);
        assert_eq!(
            rt.dof_locations()[3],
            DofLoc::Face {
                local_face: 1,
                index: 1
            }
        );

        let q2 = FiniteElement::lagrange(3, 2).unwrap();
        assert_eq!(format!("{}", q2), "Lagrange<3>(2)");
        assert_eq!(q2.n_components(), 1);
        assert_eq!(q2.n_local_dofs(), 27);
        assert_eq!(q2.functional_kind(), FunctionalKind::PointEvaluation);
        assert_eq!(q2.sample_points().len(), 27);
    }

    #[test]
    fn unsupported_dimensions() {
        assert!(matches!(
            FiniteElement::raviart_thomas(1, 0),
            Err(ElementError::UnsupportedDimension(1))
        ));
        assert!(matches!(
            FiniteElement::lagrange(4, 1),
            Err(ElementError::UnsupportedDimension(4))
        ));
    }

    #[test]
    fn lagrange_functionals_are_point_values() {
        let mesh = Mesh::hyper_cube(2, 0.0, 2.0).unwrap();
        let mapping = MappingQ::new(1).unwrap().build(&mesh, 0).unwrap();
        let fe = FiniteElement::lagrange(2, 1).unwrap();

        let samples: Vec<DVector<f64>> = fe
            .sample_points()
            .iter()
            .map(|x| DVector::from_element(1, mapping.transform(x).sum()))
            .collect();

        assert_eq!(fe.local_functionals(&samples, &mapping).unwrap(), vec![0.0, 2.0, 2.0, 4.0]);
        assert_eq!(fe.local_functional(3, &samples, &mapping).unwrap(), 4.0);
    }
}
