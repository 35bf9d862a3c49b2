use smallvec::SmallVec;
use std::fmt;

/// One cell's view of a [Face]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceSide {
    pub cell: usize,
    pub local_face: usize,
    /// `true` if this cell's outward normal is the face's canonical normal
    pub orientation: bool,
}

/// The shared boundary between two `Cell`s (or one `Cell` and the mesh boundary)
///
/// The canonical normal of a face is the outward normal of its lowest-index cell
#[derive(Debug, Clone)]
pub struct Face {
    pub id: usize,
    /// Vertex ids in the local order of the first adjacent cell
    pub vertices: SmallVec<[usize; 4]>,
    pub sides: SmallVec<[FaceSide; 2]>,
}

impl Face {
    pub fn new(id: usize, vertices: SmallVec<[usize; 4]>, first: FaceSide) -> Self {
        Self {
            id,
            vertices,
            sides: smallvec::smallvec![first],
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.sides.len() == 1
    }

    /// The side of this face seen from `cell`
    pub fn side_of(&self, cell: usize) -> Option<&FaceSide> {
        self.sides.iter().find(|side| side.cell == cell)
    }

    /// The side of this face opposite to `cell` (None on the boundary)
    pub fn neighbor_of(&self, cell: usize) -> Option<&FaceSide> {
        if self.side_of(cell).is_some() {
            self.sides.iter().find(|side| side.cell != cell)
        } else {
            None
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Face {} \t vertices: {:?} \t cells:", self.id, self.vertices)?;
        for side in self.sides.iter() {
            write!(
                f,
                " {}({}{})",
                side.cell,
                side.local_face,
                if side.orientation { "+" } else { "-" }
            )?;
        }
        Ok(())
    }
}
