/// Orientation signs of every (cell, local dof) pair, stored flat with one row per cell
///
/// Global coefficient `c` contributes `sign * c` to the local basis function it is attached to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignTable {
    signs: Vec<i8>,
    stride: usize,
}

impl SignTable {
    pub(crate) fn new(signs: Vec<i8>, stride: usize) -> Self {
        debug_assert!(stride == 0 || signs.len() % stride == 0);
        Self { signs, stride }
    }

    pub fn sign(&self, cell: usize, local_index: usize) -> f64 {
        self.signs[cell * self.stride + local_index] as f64
    }

    /// All signs of one cell in local order
    pub fn cell_signs(&self, cell: usize) -> &[i8] {
        &self.signs[cell * self.stride..(cell + 1) * self.stride]
    }

    /// Number of (cell, local dof) pairs whose sign is negative
    pub fn n_flipped(&self) -> usize {
        self.signs.iter().filter(|s| **s < 0).count()
    }
}
