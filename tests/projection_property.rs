use hdiv_interp::domain::mapping::PointMap;
use hdiv_interp::domain::mesh::cell::embed_face_point;
use hdiv_interp::error::FieldError;
use hdiv_interp::*;

use nalgebra::DVector;
use std::sync::Arc;

const UNDISTORTED_TOLERANCE: f64 = 1e-10;
const DISTORTED_TOLERANCE: f64 = 1e-8;

fn reference_mesh(dim: usize) -> Mesh {
    let mut mesh = Mesh::hyper_cube(dim, -0.3, 0.7).unwrap();
    mesh.refine_global(if dim == 2 { 2 } else { 1 }).unwrap();
    mesh
}

fn projection_residual(mesh: &Mesh, mapping: &MappingQ, element: FiniteElement, degree: usize) -> ProjectionReport {
    let mappings = MappingCache::new(mesh, mapping).unwrap();
    let dofs = DofHandler::distribute(mesh, &element).unwrap();
    let field = PolynomialField::new(element.n_components(), degree);
    check_projection(&dofs, &mappings, &field).unwrap()
}

#[test]
fn raviart_thomas_projection_2d() {
    let mesh = reference_mesh(2);

    for (order, degree, mapping_order) in [(0, 1, 1), (1, 0, 2), (1, 2, 2)] {
        let report = projection_residual(
            &mesh,
            &MappingQ::new(mapping_order).unwrap(),
            FiniteElement::raviart_thomas(2, order).unwrap(),
            degree,
        );
        assert_eq!(report.dim, 2);
        assert_eq!(report.element_name, format!("RaviartThomas<2>({})", order));
        assert!(report.residual < UNDISTORTED_TOLERANCE, "{}", report);
    }
}

#[test]
fn raviart_thomas_projection_3d() {
    let mesh = reference_mesh(3);

    for (order, degree, mapping_order) in [(0, 1, 1), (1, 0, 2), (1, 2, 2)] {
        let report = projection_residual(
            &mesh,
            &MappingQ::new(mapping_order).unwrap(),
            FiniteElement::raviart_thomas(3, order).unwrap(),
            degree,
        );
        assert_eq!(report.dim, 3);
        assert!(report.residual < UNDISTORTED_TOLERANCE, "{}", report);
    }
}

#[test]
fn lagrange_projection() {
    for dim in [2, 3] {
        let mesh = reference_mesh(dim);
        let report = projection_residual(
            &mesh,
            &MappingQ::new(1).unwrap(),
            FiniteElement::lagrange(dim, 2).unwrap(),
            3,
        );
        assert!(report.residual < UNDISTORTED_TOLERANCE, "{}", report);
    }
}

#[test]
fn projection_on_distorted_meshes() {
    for dim in [2, 3] {
        let mut mesh = reference_mesh(dim);
        mesh.distort_random(0.03, 42).unwrap();

        for (order, degree, mapping_order) in [(0, 1, 1), (1, 2, 2)] {
            let report = projection_residual(
                &mesh,
                &MappingQ::new(mapping_order).unwrap(),
                FiniteElement::raviart_thomas(dim, order).unwrap(),
                degree,
            );
            assert!(report.residual < DISTORTED_TOLERANCE, "{}", report);
        }
    }
}

#[test]
fn projection_with_curved_mapping() {
    let bend_2d: PointMap = Arc::new(|p: &DVector<f64>| {
        DVector::from_vec(vec![p[0] + 0.1 * (p[1] + 0.3) * (0.7 - p[1]), p[1] + 0.05 * p[0] * p[0]])
    });
    let bend_3d: PointMap = Arc::new(|p: &DVector<f64>| {
        DVector::from_vec(vec![p[0] + 0.05 * p[1] * p[1], p[1] + 0.05 * p[2] * p[0], p[2]])
    });

    for (dim, bend) in [(2, bend_2d), (3, bend_3d)] {
        let mesh = reference_mesh(dim);
        let mapping = MappingQ::with_deformation(2, bend).unwrap();

        for (order, degree) in [(0, 1), (1, 2)] {
            let report = projection_residual(
                &mesh,
                &mapping,
                FiniteElement::raviart_thomas(dim, order).unwrap(),
                degree,
            );
            assert!(report.residual < DISTORTED_TOLERANCE, "{}", report);
        }
    }
}

#[test]
fn lowest_order_reproduces_its_space() {
    let mesh = reference_mesh(2);
    let mappings = MappingCache::new(&mesh, &MappingQ::new(1).unwrap()).unwrap();
    let dofs = DofHandler::distribute(&mesh, &FiniteElement::raviart_thomas(2, 0).unwrap()).unwrap();

    let exact = |p: &DVector<f64>| DVector::from_vec(vec![0.4 - 1.5 * p[0], 2.0 + 0.25 * p[1]]);
    let f = FnFunction::new(2, exact);
    let field = FieldEvaluator::new(&dofs, &mappings, interpolate(&dofs, &mappings, &f).unwrap()).unwrap();

    for point in [[-0.29, 0.69], [0.0, 0.0], [0.123, -0.2], [0.65, 0.31]] {
        let point = DVector::from_vec(point.to_vec());
        let error = (field.evaluate(&point).unwrap() - exact(&point)).amax();
        assert!(error < 1e-12, "error {:e} at {:?}", error, point.as_slice());
    }
}

#[test]
fn first_order_reproduces_its_space() {
    let mut mesh = Mesh::hyper_rectangle(&[0.0, -1.0], &[2.0, 0.5]).unwrap();
    mesh.refine_global(1).unwrap();
    let mappings = MappingCache::new(&mesh, &MappingQ::new(2).unwrap()).unwrap();
    let dofs = DofHandler::distribute(&mesh, &FiniteElement::raviart_thomas(2, 1).unwrap()).unwrap();

    let exact = |p: &DVector<f64>| DVector::from_vec(vec![p[0] * p[0] - p[1], p[1] * p[1] + 3.0 * p[0]]);
    let f = FnFunction::new(2, exact);
    let field = FieldEvaluator::new(&dofs, &mappings, interpolate(&dofs, &mappings, &f).unwrap()).unwrap();

    for point in [[0.1, -0.9], [1.0, 0.0], [1.7, 0.45], [0.5, -0.25]] {
        let point = DVector::from_vec(point.to_vec());
        let error = (field.evaluate(&point).unwrap() - exact(&point)).amax();
        assert!(error < 1e-11, "error {:e} at {:?}", error, point.as_slice());
    }
}

#[test]
fn shared_faces_agree() {
    let mut mesh = reference_mesh(3);
    mesh.distort_random(0.05, 7).unwrap();
    let mappings = MappingCache::new(&mesh, &MappingQ::new(1).unwrap()).unwrap();
    let dofs = DofHandler::distribute(&mesh, &FiniteElement::raviart_thomas(3, 1).unwrap()).unwrap();

    let f = FnFunction::new(3, |p: &DVector<f64>| {
        DVector::from_vec(vec![p[1].cos(), p[0] * p[2], (p[0] + p[1]).exp()])
    });
    let coefficients = interpolate_checked(&dofs, &mappings, &f, DISTORTED_TOLERANCE).unwrap();
    let field = FieldEvaluator::new(&dofs, &mappings, coefficients).unwrap();

    for face in mesh.faces().filter(|face| !face.is_boundary()) {
        let [a, b] = [face.sides[0], face.sides[1]];
        for face_point in [[0.5, 0.5], [0.1, 0.8]] {
            let ref_a = embed_face_point(3, a.local_face, &face_point);
            let x = mappings.cell(a.cell).transform(&ref_a);
            let ref_b = mappings.cell(b.cell).inverse_transform(&x).unwrap();

            let normal = mappings.cell(a.cell).normal(a.local_face, &ref_a);
            let flux_a = field.evaluate_in_cell(a.cell, &ref_a).dot(&normal);
            let flux_b = field.evaluate_in_cell(b.cell, &ref_b).dot(&normal);
            assert!((flux_a - flux_b).abs() < DISTORTED_TOLERANCE);
        }
    }
}

#[test]
fn numbering_is_reproducible() {
    for element in [
        FiniteElement::raviart_thomas(2, 2).unwrap(),
        FiniteElement::lagrange(3, 2).unwrap(),
    ] {
        let mesh = reference_mesh(element.dim());
        let first = DofHandler::distribute(&mesh, &element).unwrap();
        let second = DofHandler::distribute(&mesh, &element).unwrap();

        assert_eq!(first.n_dofs(), second.n_dofs());
        assert_eq!(first.sign_table(), second.sign_table());
        for cell in 0..mesh.n_cells() {
            assert_eq!(first.cell_dofs(cell), second.cell_dofs(cell));
        }
    }
}

#[test]
fn evaluation_outside_the_mesh() {
    let mesh = reference_mesh(3);
    let mappings = MappingCache::new(&mesh, &MappingQ::new(1).unwrap()).unwrap();
    let dofs = DofHandler::distribute(&mesh, &FiniteElement::raviart_thomas(3, 0).unwrap()).unwrap();
    let coefficients = interpolate(&dofs, &mappings, &PolynomialField::new(3, 1)).unwrap();
    let field = FieldEvaluator::new(&dofs, &mappings, coefficients).unwrap();

    assert!(matches!(
        field.evaluate(&DVector::from_vec(vec![0.2, 0.2, 0.75])),
        Err(FemError::Field(FieldError::PointOutsideDomain(_)))
    ));
    assert!(field.evaluate(&DVector::from_vec(vec![0.2, 0.2, 0.7])).is_ok());
}

#[test]
fn scalar_field_into_vector_element() {
    let mesh = reference_mesh(2);
    let mappings = MappingCache::new(&mesh, &MappingQ::new(1).unwrap()).unwrap();
    let dofs = DofHandler::distribute(&mesh, &FiniteElement::raviart_thomas(2, 1).unwrap()).unwrap();

    assert!(matches!(
        check_projection(&dofs, &mappings, &PolynomialField::new(1, 2)),
        Err(FemError::Field(FieldError::ComponentMismatch { expected: 2, found: 1 }))
    ));
}
