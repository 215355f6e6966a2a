//! Column-major sparse matrix.
//!
//! A graph on `n` nodes is a square `n x n` matrix, where the `j`-th column holds the out-going
//! weights from the `j`-th node. A clustering is a matrix whose `j`-th column is the set of nodes
//! of the `j`-th cluster, with all values set to one.
use super::{Ivp, MatrixError, SparseVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseMatrix {
    /// The size of the universe of row indices.
    n_rows: usize,
    cols: Vec<SparseVector>,
}

/// A clustering: `n_rows` is the number of nodes, `n_cols` is the number of clusters.
pub type Clustering = SparseMatrix;

impl SparseMatrix {
    /// All-zero matrix.
    pub fn zero(n_cols: usize, n_rows: usize) -> Self {
        Self {
            n_rows,
            cols: vec![SparseVector::new(); n_cols],
        }
    }
    pub fn identity(n: usize) -> Self {
        let cols = (0..n).map(|i| SparseVector::singleton(i, 1f64)).collect();
        Self { n_rows: n, cols }
    }
    pub fn from_columns(cols: Vec<SparseVector>, n_rows: usize) -> Self {
        Self { n_rows, cols }
    }
    /// Build a matrix from (column, row, value) triplets. Duplicated entries are summed up.
    pub fn from_triplets<I>(n_cols: usize, n_rows: usize, triplets: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut buckets: Vec<Vec<(usize, f64)>> = vec![vec![]; n_cols];
        for (col, row, val) in triplets {
            assert!(col < n_cols && row < n_rows, "({col},{row}) out of range");
            buckets[col].push((row, val));
        }
        let cols = buckets.into_iter().map(SparseVector::from_pairs).collect();
        Self { n_rows, cols }
    }
    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }
    pub fn is_square(&self) -> bool {
        self.n_rows == self.cols.len()
    }
    pub fn column(&self, j: usize) -> &SparseVector {
        &self.cols[j]
    }
    pub fn column_mut(&mut self, j: usize) -> &mut SparseVector {
        &mut self.cols[j]
    }
    pub fn columns(&self) -> &[SparseVector] {
        &self.cols
    }
    pub fn columns_mut(&mut self) -> &mut [SparseVector] {
        &mut self.cols
    }
    pub fn into_columns(self) -> Vec<SparseVector> {
        self.cols
    }
    pub fn push_column(&mut self, column: SparseVector) {
        self.cols.push(column);
    }
    /// Remove the columns not satisfying `f`, shifting the later columns down.
    pub fn retain_columns<F: FnMut(&SparseVector) -> bool>(&mut self, f: F) {
        self.cols.retain(f);
    }
    /// The number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.cols.iter().map(|c| c.len()).sum()
    }
    /// The average number of entries per column.
    pub fn density(&self) -> f64 {
        match self.cols.is_empty() {
            true => 0f64,
            false => self.nnz() as f64 / self.cols.len() as f64,
        }
    }
    pub fn max_value(&self) -> f64 {
        self.cols.iter().map(|c| c.max_value()).fold(0f64, f64::max)
    }
    pub fn transpose(&self) -> Self {
        let mut counts = vec![0; self.n_rows];
        for ivp in self.cols.iter().flat_map(|c| c.iter()) {
            counts[ivp.idx] += 1;
        }
        let mut rows: Vec<Vec<Ivp>> = counts.into_iter().map(Vec::with_capacity).collect();
        for (j, col) in self.cols.iter().enumerate() {
            for ivp in col.iter() {
                rows[ivp.idx].push(Ivp::new(j, ivp.val));
            }
        }
        let cols = rows.into_iter().map(SparseVector::from_sorted).collect();
        Self {
            n_rows: self.cols.len(),
            cols,
        }
    }
    /// Normalize every column. Return the columns which could not be normalized,
    /// i.e., which were cleared because their sum was not positive.
    pub fn make_stochastic(&mut self) -> Vec<usize> {
        self.cols
            .iter_mut()
            .enumerate()
            .filter_map(|(j, col)| (!col.normalize()).then_some(j))
            .collect()
    }
    pub fn make_characteristic(&mut self) {
        self.cols.iter_mut().for_each(|c| c.make_characteristic());
    }
    fn columnwise<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(&SparseVector, &SparseVector) -> SparseVector,
    {
        assert_eq!(self.n_cols(), other.n_cols(), "column numbers differ");
        assert_eq!(self.n_rows(), other.n_rows(), "row numbers differ");
        let cols = std::iter::zip(self.cols.iter(), other.cols.iter())
            .map(|(a, b)| f(a, b))
            .collect();
        Self {
            n_rows: self.n_rows,
            cols,
        }
    }
    pub fn add(&self, other: &Self) -> Self {
        self.columnwise(other, SparseVector::add)
    }
    pub fn max(&self, other: &Self) -> Self {
        self.columnwise(other, SparseVector::max)
    }
    pub fn hadamard(&self, other: &Self) -> Self {
        self.columnwise(other, SparseVector::hadamard)
    }
    /// Relabel the nodes of a square matrix: node `i` becomes node `perm[i]`.
    pub fn permute(&self, perm: &[usize]) -> Self {
        assert!(self.is_square(), "permute a non-square matrix");
        assert_eq!(perm.len(), self.n_cols(), "permutation length mismatch");
        let mut cols = vec![SparseVector::new(); self.n_cols()];
        for (j, col) in self.cols.iter().enumerate() {
            let pairs = col.iter().map(|x| (perm[x.idx], x.val));
            cols[perm[j]] = SparseVector::from_pairs(pairs);
        }
        Self {
            n_rows: self.n_rows,
            cols,
        }
    }
    /// Set the diagonal of a square matrix. If `value` is None, the loop weight of
    /// each column is the maximum of the other entries in it (one for an empty column).
    pub fn add_loops(&mut self, value: Option<f64>) {
        assert!(self.is_square(), "add loops to a non-square matrix");
        for (j, col) in self.cols.iter_mut().enumerate() {
            let weight = match value {
                Some(w) => w,
                None => {
                    let max = col
                        .iter()
                        .filter(|x| x.idx != j)
                        .map(|x| x.val)
                        .fold(0f64, f64::max);
                    if 0f64 < max {
                        max
                    } else {
                        1f64
                    }
                }
            };
            col.set(j, weight);
        }
    }
    /// Check the invariants of every column.
    pub fn validate(&self) -> Result<(), MatrixError> {
        for (column, col) in self.cols.iter().enumerate() {
            for w in col.ivps().windows(2) {
                if w[0].idx == w[1].idx {
                    let index = w[0].idx;
                    return Err(MatrixError::DuplicateIndex { column, index });
                } else if w[1].idx < w[0].idx {
                    return Err(MatrixError::Unsorted { column });
                }
            }
            for &Ivp { idx, val } in col.iter() {
                if self.n_rows <= idx {
                    let n_rows = self.n_rows;
                    return Err(MatrixError::OutOfRange {
                        column,
                        index: idx,
                        n_rows,
                    });
                } else if !val.is_finite() {
                    return Err(MatrixError::NonFiniteValue { column, index: idx });
                } else if val < 0f64 {
                    return Err(MatrixError::NegativeValue {
                        column,
                        index: idx,
                        value: val,
                    });
                }
            }
        }
        Ok(())
    }
    /// The members of each cluster.
    pub fn members(&self) -> Vec<Vec<usize>> {
        self.cols.iter().map(|c| c.indices().collect()).collect()
    }
    /// The first cluster containing each node, None if the node is in no cluster.
    pub fn assignment(&self) -> Vec<Option<usize>> {
        let mut assignments = vec![None; self.n_rows];
        for (cl, col) in self.cols.iter().enumerate() {
            for idx in col.indices() {
                assignments[idx].get_or_insert(cl);
            }
        }
        assignments
    }
    /// Sort the columns by size in descending order, ties broken by the smallest index.
    pub fn sort_columns_by_size(&mut self) {
        self.cols.sort_by(|a, b| {
            let first = |c: &SparseVector| c.indices().next().unwrap_or(usize::MAX);
            b.len().cmp(&a.len()).then(first(a).cmp(&first(b)))
        });
    }
}

impl std::fmt::Display for SparseMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "{}x{}", self.n_rows, self.n_cols())?;
        for (j, col) in self.cols.iter().enumerate() {
            writeln!(f, "{}\t{}", j, col)?;
        }
        Ok(())
    }
}
