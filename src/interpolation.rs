use crate::domain::dof::DofHandler;
use crate::domain::fields::{check_same_mesh, FieldEvaluator};
use crate::domain::mapping::MappingCache;
use crate::error::{FieldError, Result};

use nalgebra::DVector;
use rayon::prelude::*;
use std::fmt;

/// A vector valued function of a point in real space
///
/// Implementors must be shareable between threads: cells are interpolated in parallel
pub trait VectorFunction: Sync {
    fn n_components(&self) -> usize;

    fn vector_value(&self, point: &DVector<f64>) -> Result<DVector<f64>>;
}

/// Wraps a closure as a [VectorFunction]
pub struct FnFunction<F> {
    n_components: usize,
    f: F,
}

impl<F> FnFunction<F>
where
    F: Fn(&DVector<f64>) -> DVector<f64> + Sync,
{
    pub fn new(n_components: usize, f: F) -> Self {
        Self { n_components, f }
    }
}

impl<F> VectorFunction for FnFunction<F>
where
    F: Fn(&DVector<f64>) -> DVector<f64> + Sync,
{
    fn n_components(&self) -> usize {
        self.n_components
    }

    fn vector_value(&self, point: &DVector<f64>) -> Result<DVector<f64>> {
        Ok((self.f)(point))
    }
}

/// Polynomial test field of degree `degree`: every component equals `sum_d sum_{i<=degree} (d+1)(i+1) x_d^i`
#[derive(Clone, Copy, Debug)]
pub struct PolynomialField {
    pub n_components: usize,
    pub degree: usize,
}

impl PolynomialField {
    pub fn new(n_components: usize, degree: usize) -> Self {
        Self {
            n_components,
            degree,
        }
    }

    fn scalar(&self, point: &DVector<f64>) -> f64 {
        point
            .iter()
            .enumerate()
            .map(|(d, x_d)| {
                (0..=self.degree)
                    .map(|i| ((d + 1) * (i + 1)) as f64 * x_d.powi(i as i32))
                    .sum::<f64>()
            })
            .sum()
    }
}

impl VectorFunction for PolynomialField {
    fn n_components(&self) -> usize {
        self.n_components
    }

    fn vector_value(&self, point: &DVector<f64>) -> Result<DVector<f64>> {
        Ok(DVector::from_element(self.n_components, self.scalar(point)))
    }
}

/// Interpolate `function` into the finite element space described by `dofs`
///
/// Every cell's local functionals are evaluated in parallel; the global coefficients are only written once
/// every cell has succeeded. A dof shared between cells takes the value of the last cell touching it.
pub fn interpolate<F>(dofs: &DofHandler, mappings: &MappingCache, function: &F) -> Result<Vec<f64>>
where
    F: VectorFunction + ?Sized,
{
    let local_values = local_values(dofs, mappings, function)?;
    let (coefficients, discrepancy) = assemble(dofs, &local_values, None)?;

    if let Some((dof, delta)) = discrepancy {
        log::debug!(
            "{}: largest shared dof disagreement {:e} (dof {})",
            dofs.element().name(),
            delta,
            dof
        );
    }

    Ok(coefficients)
}

/// Same as [interpolate], but fails with [FieldError::InconsistentSharedDof] when two cells disagree on a
/// shared dof by more than `tolerance * max(1, |value|)`
pub fn interpolate_checked<F>(
    dofs: &DofHandler,
    mappings: &MappingCache,
    function: &F,
    tolerance: f64,
) -> Result<Vec<f64>>
where
    F: VectorFunction + ?Sized,
{
    let local_values = local_values(dofs, mappings, function)?;
    let (coefficients, _) = assemble(dofs, &local_values, Some(tolerance))?;
    Ok(coefficients)
}

// local functionals of every cell, in cell order, with orientation signs applied
fn local_values<F>(dofs: &DofHandler, mappings: &MappingCache, function: &F) -> Result<Vec<Vec<f64>>>
where
    F: VectorFunction + ?Sized,
{
    check_same_mesh(dofs, mappings)?;

    let element = dofs.element();
    if function.n_components() != element.n_components() {
        return Err(FieldError::ComponentMismatch {
            expected: element.n_components(),
            found: function.n_components(),
        }
        .into());
    }

    let signs = dofs.sign_table();
    (0..dofs.n_cells())
        .into_par_iter()
        .map(|cell| -> Result<Vec<f64>> {
            let mapping = mappings.cell(cell);
            let samples = element
                .sample_points()
                .iter()
                .map(|x| -> Result<DVector<f64>> {
                    let value = function.vector_value(&mapping.transform(x))?;
                    if value.len() != element.n_components() {
                        return Err(FieldError::ComponentMismatch {
                            expected: element.n_components(),
                            found: value.len(),
                        }
                        .into());
                    }
                    Ok(value)
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(element
                .local_functionals(&samples, mapping)?
                .into_iter()
                .enumerate()
                .map(|(i, value)| signs.sign(cell, i) * value)
                .collect())
        })
        .collect()
}

// scatter local values into a fresh global array; returns the largest disagreement on a shared dof
fn assemble(
    dofs: &DofHandler,
    local_values: &[Vec<f64>],
    tolerance: Option<f64>,
) -> Result<(Vec<f64>, Option<(usize, f64)>)> {
    let mut coefficients = vec![0.0; dofs.n_dofs()];
    let mut written = vec![false; dofs.n_dofs()];
    let mut discrepancy: Option<(usize, f64)> = None;

    for (cell, values) in local_values.iter().enumerate() {
        for (dof, value) in dofs.cell_dofs(cell).iter().zip(values.iter()) {
            if written[*dof] {
                let previous = coefficients[*dof];
                let delta = (value - previous).abs();

                if let Some(tolerance) = tolerance {
                    if delta > tolerance * previous.abs().max(1.0) {
                        return Err(FieldError::InconsistentSharedDof {
                            dof: *dof,
                            first: previous,
                            second: *value,
                        }
                        .into());
                    }
                }
                if discrepancy.map_or(true, |(_, max)| delta > max) {
                    discrepancy = Some((*dof, delta));
                }
            }

            coefficients[*dof] = *value;
            written[*dof] = true;
        }
    }

    Ok((coefficients, discrepancy))
}

/// Result of a projection check
#[derive(Clone, Debug)]
pub struct ProjectionReport {
    pub element_name: String,
    pub dim: usize,
    /// max norm of the difference between the coefficients of `f` and those of its reconstruction
    pub residual: f64,
}

impl fmt::Display for ProjectionReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "dim {} {}: projection residual {:e}",
            self.dim, self.element_name, self.residual
        )
    }
}

/// Interpolate `function`, reconstruct the resulting field, and interpolate that field again
///
/// Interpolation is a projection, so both coefficient arrays should agree up to rounding
pub fn check_projection<F>(dofs: &DofHandler, mappings: &MappingCache, function: &F) -> Result<ProjectionReport>
where
    F: VectorFunction + ?Sized,
{
    let first = interpolate(dofs, mappings, function)?;
    let evaluator = FieldEvaluator::new(dofs, mappings, first.clone())?;
    let second = interpolate(dofs, mappings, &evaluator)?;

    let residual = first
        .iter()
        .zip(second.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);

    let report = ProjectionReport {
        element_name: dofs.element().name(),
        dim: mappings.mesh().dim(),
        residual,
    };
    log::info!("{}", report);

    Ok(report)
}
