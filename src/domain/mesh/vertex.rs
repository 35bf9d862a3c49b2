use nalgebra::DVector;
use std::fmt;

/// A point in real space, shared by the `Cell`s around it
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: usize,
    pub coords: DVector<f64>,
    pub boundary: bool,
}

impl Vertex {
    pub fn new(id: usize, coords: DVector<f64>) -> Self {
        Self {
            id,
            coords,
            boundary: false,
        }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Vertex {} \t {:?}", self.id, self.coords.as_slice())?;
        if self.boundary {
            write!(f, " (boundary)")?;
        }
        Ok(())
    }
}
