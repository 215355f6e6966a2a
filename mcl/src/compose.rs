//! Sparse matrix-vector and matrix-matrix products.
//!
//! The product `M v` is the sum of the columns of `M` scaled by the entries of `v`.
//! The sum is accumulated either into a full-width array ([DenseAccumulator]) or into
//! an array whose touched rows are remembered ([SparseAccumulator]). Both produce the same set
//! of non-zero rows. The order of floating point additions may differ between the two, so the
//! last bits of the values can differ as well.
use super::config::ComposeMode;
use definitions::{KthMode, SparseMatrix, SparseVector};

pub trait Accumulator {
    /// Add `factor * column`.
    fn add_scaled(&mut self, column: &SparseVector, factor: f64);
    /// Move the accumulated non-zero values into `dst` in ascending order,
    /// and reset the accumulator.
    fn drain_into(&mut self, dst: &mut SparseVector);
}

#[derive(Debug, Clone, Default)]
pub struct DenseAccumulator {
    values: Vec<f64>,
}

impl DenseAccumulator {
    pub fn new(n_rows: usize) -> Self {
        Self {
            values: vec![0f64; n_rows],
        }
    }
    fn ensure(&mut self, n_rows: usize) {
        if self.values.len() < n_rows {
            self.values.resize(n_rows, 0f64);
        }
    }
}

impl Accumulator for DenseAccumulator {
    fn add_scaled(&mut self, column: &SparseVector, factor: f64) {
        for ivp in column.iter() {
            self.values[ivp.idx] += factor * ivp.val;
        }
    }
    fn drain_into(&mut self, dst: &mut SparseVector) {
        dst.clear();
        for (idx, val) in self.values.iter_mut().enumerate() {
            if *val != 0f64 {
                dst.push(idx, *val);
                *val = 0f64;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SparseAccumulator {
    values: Vec<f64>,
    is_touched: Vec<bool>,
    touched: Vec<usize>,
}

impl SparseAccumulator {
    pub fn new(n_rows: usize) -> Self {
        Self {
            values: vec![0f64; n_rows],
            is_touched: vec![false; n_rows],
            touched: vec![],
        }
    }
    fn ensure(&mut self, n_rows: usize) {
        if self.values.len() < n_rows {
            self.values.resize(n_rows, 0f64);
            self.is_touched.resize(n_rows, false);
        }
    }
}

impl Accumulator for SparseAccumulator {
    fn add_scaled(&mut self, column: &SparseVector, factor: f64) {
        for ivp in column.iter() {
            if !self.is_touched[ivp.idx] {
                self.is_touched[ivp.idx] = true;
                self.touched.push(ivp.idx);
            }
            self.values[ivp.idx] += factor * ivp.val;
        }
    }
    fn drain_into(&mut self, dst: &mut SparseVector) {
        dst.clear();
        self.touched.sort_unstable();
        for &idx in self.touched.iter() {
            let val = std::mem::replace(&mut self.values[idx], 0f64);
            self.is_touched[idx] = false;
            if val != 0f64 {
                dst.push(idx, val);
            }
        }
        self.touched.clear();
    }
}

/// Scratch space for repeated products. One per thread; reused for every column.
#[derive(Debug, Clone)]
pub struct Composer {
    mode: ComposeMode,
    dense: DenseAccumulator,
    sparse: SparseAccumulator,
}

impl Composer {
    pub fn new(mode: ComposeMode) -> Self {
        Self {
            mode,
            dense: DenseAccumulator::default(),
            sparse: SparseAccumulator::default(),
        }
    }
    /// Compute `mx * src` into `dst`.
    pub fn compose_into(&mut self, mx: &SparseMatrix, src: &SparseVector, dst: &mut SparseVector) {
        let use_dense = match self.mode {
            ComposeMode::Dense => true,
            ComposeMode::Sparse => false,
            ComposeMode::Auto => {
                let expected: usize = src.iter().map(|x| mx.column(x.idx).len()).sum();
                mx.n_rows() <= 4 * expected
            }
        };
        if use_dense {
            self.dense.ensure(mx.n_rows());
            accumulate(&mut self.dense, mx, src, dst);
        } else {
            self.sparse.ensure(mx.n_rows());
            accumulate(&mut self.sparse, mx, src, dst);
        }
    }
}

fn accumulate<A: Accumulator>(
    acc: &mut A,
    mx: &SparseMatrix,
    src: &SparseVector,
    dst: &mut SparseVector,
) {
    for ivp in src.iter() {
        acc.add_scaled(mx.column(ivp.idx), ivp.val);
    }
    acc.drain_into(dst);
}

/// `mx * src`.
pub fn compose(mx: &SparseMatrix, src: &SparseVector, mode: ComposeMode) -> SparseVector {
    if let Some(last) = src.iter().last() {
        assert!(last.idx < mx.n_cols(), "vector longer than the matrix");
    }
    let mut dst = SparseVector::new();
    Composer::new(mode).compose_into(mx, src, &mut dst);
    dst
}

/// `left * right`. If `max_density` is given, each column of the result keeps
/// only (about) that many largest entries.
pub fn compose_matrix(
    left: &SparseMatrix,
    right: &SparseMatrix,
    mode: ComposeMode,
    max_density: Option<usize>,
) -> SparseMatrix {
    assert_eq!(left.n_cols(), right.n_rows(), "dimensions do not match");
    let mut composer = Composer::new(mode);
    let cols = right
        .columns()
        .iter()
        .map(|src| {
            let mut dst = SparseVector::new();
            composer.compose_into(left, src, &mut dst);
            if let Some(max) = max_density.filter(|&max| max < dst.len()) {
                let bar = dst.kth_order_value(max, None, KthMode::Large);
                dst.select_at_or_above(bar);
            }
            dst
        })
        .collect();
    SparseMatrix::from_columns(cols, left.n_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;
    fn gen_matrix<R: Rng>(rng: &mut R, n: usize, p: f64) -> SparseMatrix {
        let mut triplets = vec![];
        for j in 0..n {
            for i in 0..n {
                if rng.gen_bool(p) {
                    triplets.push((j, i, rng.gen_range(0.01..1f64)));
                }
            }
        }
        SparseMatrix::from_triplets(n, n, triplets)
    }
    fn to_dense(mx: &SparseMatrix) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(mx.n_rows(), mx.n_cols());
        for (j, col) in mx.columns().iter().enumerate() {
            for ivp in col.iter() {
                dense[(ivp.idx, j)] = ivp.val;
            }
        }
        dense
    }
    #[test]
    fn identity_is_neutral() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(24);
        let id = SparseMatrix::identity(30);
        for _ in 0..20 {
            let pairs: Vec<_> = (0..10)
                .map(|_| (rng.gen_range(0..30), rng.gen_range(0.1..1f64)))
                .collect();
            let v = SparseVector::from_pairs(pairs);
            for mode in [ComposeMode::Dense, ComposeMode::Sparse, ComposeMode::Auto] {
                assert_eq!(compose(&id, &v, mode), v);
            }
        }
    }
    #[test]
    fn matches_dense_product() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(4324);
        for p in [0.05, 0.2, 0.7] {
            let left = gen_matrix(&mut rng, 25, p);
            let right = gen_matrix(&mut rng, 25, p);
            let answer = to_dense(&left) * to_dense(&right);
            for mode in [ComposeMode::Dense, ComposeMode::Sparse] {
                let product = compose_matrix(&left, &right, mode, None);
                assert!(product.validate().is_ok());
                let diff = (to_dense(&product) - &answer).amax();
                assert!(diff < 1e-10, "{}", diff);
            }
        }
    }
    #[test]
    fn same_support_in_both_modes() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(92);
        let mx = gen_matrix(&mut rng, 40, 0.1);
        let mut composer_d = Composer::new(ComposeMode::Dense);
        let mut composer_s = Composer::new(ComposeMode::Sparse);
        for src in mx.columns() {
            let (mut d, mut s) = (SparseVector::new(), SparseVector::new());
            composer_d.compose_into(&mx, src, &mut d);
            composer_s.compose_into(&mx, src, &mut s);
            assert_eq!(d.indices().collect::<Vec<_>>(), s.indices().collect::<Vec<_>>());
        }
    }
    #[test]
    fn density_cap() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(32);
        let mx = gen_matrix(&mut rng, 30, 0.5);
        let full = compose_matrix(&mx, &mx, ComposeMode::Auto, None);
        let capped = compose_matrix(&mx, &mx, ComposeMode::Auto, Some(5));
        for (f, c) in std::iter::zip(full.columns(), capped.columns()) {
            assert!(5 <= c.len() || c.len() == f.len());
            if let (Some(min), true) = (c.min_value(), c.len() < f.len()) {
                let dropped = f.set_minus(c);
                assert!(dropped.max_value() <= min);
            }
        }
    }
}
