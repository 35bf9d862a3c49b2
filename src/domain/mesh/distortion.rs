use super::cell::n_vertices;
use super::{check_cell_geometry, Mesh};
use crate::error::MeshError;

use nalgebra::DVector;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Parameters of a random vertex perturbation
#[derive(Clone, Copy, Debug)]
pub struct DistortionOptions {
    /// Maximum shift of a vertex relative to the shortest edge touching it
    pub factor: f64,
    pub seed: u64,
    /// Leave vertices on the mesh boundary in place
    pub keep_boundary: bool,
}

impl DistortionOptions {
    pub fn new(factor: f64, seed: u64) -> Self {
        Self {
            factor,
            seed,
            keep_boundary: true,
        }
    }
}

impl Mesh {
    /// Randomly move every interior vertex by at most `factor` times the shortest edge touching it
    ///
    /// The perturbed mesh is validated before it is committed: if any cell would be inverted or
    /// degenerate, an error is returned and the mesh is left untouched.
    pub fn distort_random(&mut self, factor: f64, seed: u64) -> Result<(), MeshError> {
        self.distort_random_with(DistortionOptions::new(factor, seed))
    }

    pub fn distort_random_with(&mut self, options: DistortionOptions) -> Result<(), MeshError> {
        if !options.factor.is_finite() || options.factor < 0.0 {
            return Err(MeshError::InvalidDistortion(options.factor));
        }

        let dim = self.dim;
        let edge_lengths = self.min_adjacent_edge_lengths();
        let mut rng = StdRng::seed_from_u64(options.seed);

        let mut moved = 0;
        let positions: Vec<DVector<f64>> = self
            .vertices
            .iter()
            .zip(edge_lengths.iter())
            .map(|(vertex, h)| {
                // always draw, so the shift of a vertex doesn't depend on which others are fixed
                let direction = DVector::from_fn(dim, |_, _| rng.random_range(-1.0..1.0));
                let radius: f64 = rng.random();

                let norm = direction.norm();
                if (vertex.boundary && options.keep_boundary) || norm < f64::EPSILON {
                    vertex.coords.clone()
                } else {
                    moved += 1;
                    &vertex.coords + direction * (options.factor * h * radius / norm)
                }
            })
            .collect();

        check_cell_geometry(dim, &positions, &self.cells)?;

        for (vertex, position) in self.vertices.iter_mut().zip(positions) {
            vertex.coords = position;
        }

        log::debug!(
            "distorted {} of {} vertices (factor {}, seed {})",
            moved,
            self.n_vertices(),
            options.factor,
            options.seed
        );

        Ok(())
    }

    // length of the shortest cell edge touching each vertex
    fn min_adjacent_edge_lengths(&self) -> Vec<f64> {
        let mut lengths = vec![f64::INFINITY; self.vertices.len()];

        for cell in self.cells.iter() {
            for a in 0..n_vertices(self.dim) {
                for d in 0..self.dim {
                    let b = a | (1 << d);
                    if b != a {
                        let [va, vb] = [cell.vertices[a], cell.vertices[b]];
                        let length = (&self.vertices[va].coords - &self.vertices[vb].coords).norm();
                        lengths[va] = lengths[va].min(length);
                        lengths[vb] = lengths[vb].min(length);
                    }
                }
            }
        }

        lengths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;

    fn refined_square() -> Mesh {
        let mut mesh = Mesh::hyper_cube(2, -0.3, 0.7).unwrap();
        mesh.refine_global(2).unwrap();
        mesh
    }

    #[test]
    fn interior_vertices_move_within_bounds() {
        let original = refined_square();
        let mut mesh = original.clone();
        mesh.distort_random(0.03, 17).unwrap();

        let mut n_moved = 0;
        for (before, after) in original.vertices.iter().zip(mesh.vertices.iter()) {
            let shift = (&before.coords - &after.coords).norm();
            if before.boundary {
                assert_eq!(shift, 0.0);
            } else {
                assert!(shift <= 0.03 * 0.25 + 1e-15);
                if shift > 0.0 {
                    n_moved += 1;
                }
            }
        }
        assert_eq!(n_moved, 9);
    }

    #[test]
    fn distortion_is_reproducible() {
        let mut a = refined_square();
        let mut b = refined_square();
        a.distort_random(0.1, 5).unwrap();
        b.distort_random(0.1, 5).unwrap();

        for (va, vb) in a.vertices.iter().zip(b.vertices.iter()) {
            assert_eq!(va.coords, vb.coords);
        }
    }

    #[test]
    fn boundary_can_move() {
        let original = refined_square();
        let mut mesh = original.clone();
        mesh.distort_random_with(DistortionOptions {
            factor: 0.05,
            seed: 3,
            keep_boundary: false,
        })
        .unwrap();

        assert!(original
            .vertices
            .iter()
            .zip(mesh.vertices.iter())
            .any(|(before, after)| before.boundary && before.coords != after.coords));
    }

    #[test]
    fn rejected_distortion_leaves_mesh_untouched() {
        let mut mesh = refined_square();

        // shifts of several edge lengths fold cells over
        let mut rejected = false;
        for seed in 0..20 {
            let before: Vec<DVector<f64>> = mesh.vertices.iter().map(|v| v.coords.clone()).collect();
            if let Err(err) = mesh.distort_random(4.0, seed) {
                assert!(matches!(
                    err,
                    MeshError::Geometry(GeometryError::DegenerateGeometry { .. })
                ));
                assert!(before
                    .iter()
                    .zip(mesh.vertices.iter())
                    .all(|(b, v)| *b == v.coords));
                rejected = true;
                break;
            }
        }
        assert!(rejected);

        assert!(matches!(
            mesh.distort_random(f64::NAN, 0),
            Err(MeshError::InvalidDistortion(_))
        ));
    }
}
