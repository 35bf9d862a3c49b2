//! Global numbering of the degrees of freedom of a finite element on a Mesh.
//! Keeps track of which cells share each degree of freedom and with which orientation.
pub mod sign_table;

use super::mesh::Mesh;
use crate::basis::{DofLoc, FiniteElement};
use crate::error::DofError;
use sign_table::SignTable;

use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// A (cell, local index) pair referring to one local basis function
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DofAddress {
    pub cell: usize,
    pub local_index: usize,
}

impl DofAddress {
    pub fn new(cell: usize, local_index: usize) -> Self {
        Self { cell, local_index }
    }
}

impl fmt::Display for DofAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.cell, self.local_index)
    }
}

/// A single global degree of freedom
#[derive(Clone, Debug)]
pub struct Dof {
    pub id: usize,
    addresses: SmallVec<[DofAddress; 4]>,
}

impl Dof {
    fn new(id: usize, first: DofAddress) -> Self {
        Self {
            id,
            addresses: smallvec::smallvec![first],
        }
    }

    /// Every local basis function sharing this degree of freedom, in order of first encounter
    pub fn addresses(&self) -> &[DofAddress] {
        &self.addresses
    }

    pub fn is_shared(&self) -> bool {
        self.addresses.len() > 1
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Dof {} \t[", self.id)?;
        for address in self.addresses.iter() {
            write!(f, " {}", address)?;
        }
        write!(f, " ]")
    }
}

// identifies a shared entity independently of the cell it is seen from
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DofKey {
    Face { face: usize, index: usize },
    Lattice(SmallVec<[(usize, usize); 8]>),
}

/// Global numbering, sharing and orientation signs of the degrees of freedom of `element` on a mesh
#[derive(Clone, Debug)]
pub struct DofHandler {
    element: FiniteElement,
    n_local: usize,
    cell_dofs: Vec<usize>,
    signs: SignTable,
    dofs: Vec<Dof>,
}

impl DofHandler {
    /// Number every degree of freedom: cells in index order, local dofs in local order, allocating
    /// a new id on first encounter of each shared entity
    ///
    /// The result depends only on the mesh topology
    pub fn distribute(mesh: &Mesh, element: &FiniteElement) -> Result<Self, DofError> {
        let dim = mesh.dim();
        if element.dim() != dim {
            return Err(DofError::DimensionMismatch {
                mesh: dim,
                element: element.dim(),
            });
        }

        let n_local = element.n_local_dofs();
        let order = element.order();
        let locations = element.dof_locations();

        // face moments of degree >= 1 depend on how each side parametrizes the face
        if order >= 1
            && locations
                .iter()
                .any(|loc| matches!(loc, DofLoc::Face { .. }))
        {
            check_face_parametrizations(mesh)?;
        }

        let mut id_tracker = IdTracker::new(0);
        let mut shared: BTreeMap<DofKey, usize> = BTreeMap::new();
        let mut dofs: Vec<Dof> = Vec::new();
        let mut cell_dofs = Vec::with_capacity(mesh.n_cells() * n_local);
        let mut signs = Vec::with_capacity(mesh.n_cells() * n_local);

        for cell in mesh.cells() {
            for (local_index, loc) in locations.iter().enumerate() {
                let address = DofAddress::new(cell.id, local_index);

                let (key, sign) = match loc {
                    DofLoc::Cell => (None, 1),
                    DofLoc::Face { local_face, index } => {
                        let face = &mesh.faces[cell.faces[*local_face]];
                        let oriented = face
                            .side_of(cell.id)
                            .map(|side| side.orientation)
                            .unwrap_or(true);
                        (
                            Some(DofKey::Face {
                                face: face.id,
                                index: *index,
                            }),
                            if oriented { 1 } else { -1 },
                        )
                    }
                    DofLoc::Lattice(t) => (
                        Some(DofKey::Lattice(lattice_key(&cell.vertices, t, order))),
                        1,
                    ),
                };

                let dof_id = match key {
                    Some(key) => match shared.get(&key) {
                        Some(id) => {
                            dofs[*id].addresses.push(address);
                            *id
                        }
                        None => {
                            let id = id_tracker.next_id();
                            dofs.push(Dof::new(id, address));
                            shared.insert(key, id);
                            id
                        }
                    },
                    None => {
                        let id = id_tracker.next_id();
                        dofs.push(Dof::new(id, address));
                        id
                    }
                };

                cell_dofs.push(dof_id);
                signs.push(sign);
            }
        }

        log::debug!(
            "{}: distributed {} dofs over {} cells ({} shared)",
            element.name(),
            dofs.len(),
            mesh.n_cells(),
            dofs.iter().filter(|dof| dof.is_shared()).count()
        );

        Ok(Self {
            element: element.clone(),
            n_local,
            cell_dofs,
            signs: SignTable::new(signs, n_local),
            dofs,
        })
    }

    pub fn n_dofs(&self) -> usize {
        self.dofs.len()
    }

    pub fn n_cells(&self) -> usize {
        if self.n_local == 0 {
            0
        } else {
            self.cell_dofs.len() / self.n_local
        }
    }

    pub fn element(&self) -> &FiniteElement {
        &self.element
    }

    pub fn sign_table(&self) -> &SignTable {
        &self.signs
    }

    /// Global dof ids of a cell's local basis functions, in local order
    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        &self.cell_dofs[cell * self.n_local..(cell + 1) * self.n_local]
    }

    pub fn dofs(&self) -> impl Iterator<Item = &Dof> + '_ {
        self.dofs.iter()
    }

    pub fn dof(&self, id: usize) -> &Dof {
        &self.dofs[id]
    }
}

/// Orientation independent key of a lattice point: the cell vertices it is a (multilinear) combination of,
/// paired with their integer weights `prod_d (bit_d ? t_d : order - t_d)`
fn lattice_key(cell_vertices: &[usize], t: &[usize], order: usize) -> SmallVec<[(usize, usize); 8]> {
    let mut key: SmallVec<[(usize, usize); 8]> = cell_vertices
        .iter()
        .enumerate()
        .map(|(v, vertex_id)| {
            let weight: usize = t
                .iter()
                .enumerate()
                .map(|(d, t_d)| if (v >> d) & 1 == 1 { *t_d } else { order - t_d })
                .product();
            (*vertex_id, weight)
        })
        .filter(|(_, weight)| *weight > 0)
        .collect();
    key.sort_unstable();
    key
}

// both sides of every interior face must list the face's vertices in the same order
fn check_face_parametrizations(mesh: &Mesh) -> Result<(), DofError> {
    for face in mesh.faces().filter(|f| !f.is_boundary()) {
        for side in face.sides.iter() {
            if mesh.cells[side.cell].face_vertices(mesh.dim(), side.local_face) != face.vertices {
                return Err(DofError::MismatchedFaceOrientation { face: face.id });
            }
        }
    }
    Ok(())
}

struct IdTracker {
    next_id: usize,
}

impl IdTracker {
    pub fn new(start: usize) -> Self {
        Self { next_id: start }
    }

    pub fn next_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id - 1
    }
}
