use super::cell::{n_vertices, Cell, CellVertices};
use super::vertex::Vertex;
use super::Mesh;
use crate::basis::polynomials::tensor_indices;
use crate::error::MeshError;

use nalgebra::DVector;
use smallvec::SmallVec;
use std::collections::BTreeMap;

impl Mesh {
    /// Split every cell into `2^dim` children, `levels` times over
    ///
    /// New vertices sit at the centre of the parent's edges, faces and interior. Vertices created on a
    /// sub-entity shared between neighbouring cells are created once and shared by every child touching it.
    pub fn refine_global(&mut self, levels: usize) -> Result<(), MeshError> {
        for _ in 0..levels {
            self.refine_once();
            self.build_faces()?;

            log::debug!(
                "global refinement: {} cells, {} vertices, {} faces",
                self.n_cells(),
                self.n_vertices(),
                self.n_faces()
            );
        }
        Ok(())
    }

    fn refine_once(&mut self) {
        let dim = self.dim;
        let mut sub_entity_vertices: BTreeMap<SmallVec<[usize; 8]>, usize> = BTreeMap::new();
        let mut children: Vec<Cell> = Vec::with_capacity(self.cells.len() * n_vertices(dim));

        for parent in self.cells.iter() {
            // vertex ids on the 3^dim lattice of the refined parent
            let lattice: Vec<usize> = tensor_indices(dim, 3)
                .map(|t| {
                    let parent_ids = lattice_parent_vertices(&parent.vertices, &t);
                    if parent_ids.len() == 1 {
                        parent_ids[0]
                    } else {
                        let mut key = parent_ids.clone();
                        key.sort_unstable();
                        *sub_entity_vertices.entry(key).or_insert_with(|| {
                            let id = self.vertices.len();
                            let centre = parent_ids
                                .iter()
                                .fold(DVector::zeros(dim), |acc, v| acc + &self.vertices[*v].coords)
                                / parent_ids.len() as f64;
                            self.vertices.push(Vertex::new(id, centre));
                            id
                        })
                    }
                })
                .collect();

            let level = parent.level.saturating_add(1);
            for c in tensor_indices(dim, 2) {
                let vertices: CellVertices = (0..n_vertices(dim))
                    .map(|v| {
                        let flat: usize = (0..dim)
                            .map(|d| (c[d] + ((v >> d) & 1)) * 3_usize.pow(d as u32))
                            .sum();
                        lattice[flat]
                    })
                    .collect();
                children.push(Cell::new(children.len(), vertices, level));
            }
        }

        self.cells = children;
    }
}

/// Parent vertices spanning the sub-entity at lattice point `t` (each `t_d` in `{0, 1, 2}`)
fn lattice_parent_vertices(parent: &[usize], t: &[usize]) -> SmallVec<[usize; 8]> {
    (0..parent.len())
        .filter(|v| {
            t.iter().enumerate().all(|(d, t_d)| match t_d {
                0 => (v >> d) & 1 == 0,
                2 => (v >> d) & 1 == 1,
                _ => true,
            })
        })
        .map(|v| parent[v])
        .collect()
}
