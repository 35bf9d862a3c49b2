use super::polynomials::{lagrange_tensor, tensor_indices, MultiIndex};
use super::DofLoc;
use crate::error::ElementError;

use nalgebra::DVector;

/// Scalar tensor-product Lagrange element `Q_k` with equispaced support points
#[derive(Clone, Debug)]
pub struct LagrangeElement {
    dim: usize,
    order: usize,
    lattice: Vec<MultiIndex>,
    support_points: Vec<DVector<f64>>,
    locations: Vec<DofLoc>,
}

impl LagrangeElement {
    pub fn new(dim: usize, order: usize) -> Result<Self, ElementError> {
        if !(2..=3).contains(&dim) {
            return Err(ElementError::UnsupportedDimension(dim));
        }
        if order == 0 {
            return Err(ElementError::UnsupportedOrder {
                family: "Lagrange",
                order,
            });
        }

        let lattice: Vec<MultiIndex> = tensor_indices(dim, order + 1).collect();
        let support_points = lattice
            .iter()
            .map(|t| DVector::from_iterator(dim, t.iter().map(|t_d| *t_d as f64 / order as f64)))
            .collect();
        let locations = lattice.iter().cloned().map(DofLoc::Lattice).collect();

        Ok(Self {
            dim,
            order,
            lattice,
            support_points,
            locations,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn n_local_dofs(&self) -> usize {
        self.lattice.len()
    }

    pub fn dof_locations(&self) -> &[DofLoc] {
        &self.locations
    }

    /// One sample per support point
    pub fn sample_points(&self) -> &[DVector<f64>] {
        &self.support_points
    }

    pub fn basis_value(&self, local_index: usize, ref_point: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(
            1,
            lagrange_tensor(self.order, &self.lattice[local_index], ref_point.as_slice()),
        )
    }

    /// Point evaluation at the support point of `local_index`
    pub fn local_functional(&self, local_index: usize, samples: &[DVector<f64>]) -> f64 {
        samples[local_index][0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_is_nodal() {
        let fe = LagrangeElement::new(3, 2).unwrap();
        assert_eq!(fe.n_local_dofs(), 27);

        for (i, point) in fe.sample_points().iter().enumerate() {
            for j in 0..fe.n_local_dofs() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((fe.basis_value(j, point)[0] - expected).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn order_zero_is_rejected() {
        assert!(matches!(
            LagrangeElement::new(2, 0),
            Err(ElementError::UnsupportedOrder { order: 0, .. })
        ));
    }
}
