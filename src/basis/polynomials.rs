use smallvec::SmallVec;

/// A multi-index into a tensor-product structure (one entry per coordinate direction)
pub type MultiIndex = SmallVec<[usize; 3]>;

/// Iterate over all multi-indices of `{0, .., n-1}^dim`, with the first coordinate varying fastest
///
/// ```
/// use hdiv_interp::basis::polynomials::tensor_indices;
///
/// let indices: Vec<_> = tensor_indices(2, 2).map(|idx| [idx[0], idx[1]]).collect();
/// assert_eq!(indices, vec![[0, 0], [1, 0], [0, 1], [1, 1]]);
/// ```
pub fn tensor_indices(dim: usize, n: usize) -> impl Iterator<Item = MultiIndex> {
    let total = n.pow(dim as u32);
    (0..total).map(move |mut flat| {
        let mut idx = MultiIndex::with_capacity(dim);
        for _ in 0..dim {
            idx.push(flat % n);
            flat /= n;
        }
        idx
    })
}

/// Iterate over the multi-indices of a box `{0, .., extents[0]-1} x {0, .., extents[1]-1} x ...`
pub fn box_indices(extents: &[usize]) -> impl Iterator<Item = MultiIndex> + '_ {
    let total: usize = extents.iter().product();
    (0..total).map(move |mut flat| {
        let mut idx = MultiIndex::with_capacity(extents.len());
        for extent in extents {
            idx.push(flat % extent);
            flat /= extent;
        }
        idx
    })
}

/// Legendre polynomial of degree `n` shifted onto `[0, 1]`
pub fn shifted_legendre(n: usize, x: f64) -> f64 {
    let t = 2.0 * x - 1.0;
    match n {
        0 => 1.0,
        1 => t,
        _ => {
            let (mut p_prev, mut p) = (1.0, t);
            for k in 1..n {
                let k_ = k as f64;
                let p_next = ((2.0 * k_ + 1.0) * t * p - k_ * p_prev) / (k_ + 1.0);
                p_prev = p;
                p = p_next;
            }
            p
        }
    }
}

/// The `j`th Lagrange polynomial over `order + 1` equispaced nodes on `[0, 1]`
pub fn lagrange_1d(order: usize, j: usize, x: f64) -> f64 {
    let node = |m: usize| m as f64 / order as f64;
    (0..=order)
        .filter(|m| *m != j)
        .map(|m| (x - node(m)) / (node(j) - node(m)))
        .product()
}

/// Derivative of [lagrange_1d]
pub fn lagrange_1d_d1(order: usize, j: usize, x: f64) -> f64 {
    let node = |m: usize| m as f64 / order as f64;
    (0..=order)
        .filter(|l| *l != j)
        .map(|l| {
            let rest: f64 = (0..=order)
                .filter(|m| *m != j && *m != l)
                .map(|m| (x - node(m)) / (node(j) - node(m)))
                .product();
            rest / (node(j) - node(l))
        })
        .sum()
}

/// Tensor product of 1D Lagrange polynomials, selected by a lattice multi-index
pub fn lagrange_tensor(order: usize, lattice: &[usize], x: &[f64]) -> f64 {
    lattice
        .iter()
        .zip(x.iter())
        .map(|(j, x_d)| lagrange_1d(order, *j, *x_d))
        .product()
}

/// Partial derivative of [lagrange_tensor] with respect to coordinate `dir`
pub fn lagrange_tensor_d1(order: usize, lattice: &[usize], x: &[f64], dir: usize) -> f64 {
    lattice
        .iter()
        .zip(x.iter())
        .enumerate()
        .map(|(d, (j, x_d))| {
            if d == dir {
                lagrange_1d_d1(order, *j, *x_d)
            } else {
                lagrange_1d(order, *j, *x_d)
            }
        })
        .product()
}
