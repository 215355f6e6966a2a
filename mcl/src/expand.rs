//! Expansion -- square the matrix column by column, and prune each column.
use super::compose::Composer;
use super::config::{MclConfig, PruneConfig};
use super::prune::{prune, PruneStats};
use super::workers::{split_ranges, Workers};
use definitions::{SparseMatrix, SparseVector};
use rayon::prelude::*;
use std::ops::Range;

#[derive(Debug, Clone, Default)]
pub struct ExpandStats {
    /// The maximum inhomogeneity over the expanded columns.
    pub chaos: f64,
    /// The largest expanded column before pruning.
    pub max_expanded: usize,
    pub prune: PruneStats,
}

impl ExpandStats {
    pub fn new(worst_n: usize) -> Self {
        Self {
            prune: PruneStats::new(worst_n),
            ..Default::default()
        }
    }
    pub fn merge(&mut self, other: ExpandStats) {
        self.chaos = self.chaos.max(other.chaos);
        self.max_expanded = self.max_expanded.max(other.max_expanded);
        self.prune.merge(other.prune);
    }
}

/// `(max - center) * size`. Zero if all the values of a stochastic vector are the same.
pub fn inhomogeneity(v: &SparseVector) -> f64 {
    (v.max_value() - v.center()) * v.len() as f64
}

fn expand_range(
    mx: &SparseMatrix,
    range: Range<usize>,
    c: &PruneConfig,
) -> (Vec<SparseVector>, ExpandStats) {
    let mut composer = Composer::new(c.compose);
    let mut backup = SparseVector::new();
    let mut stats = ExpandStats::new(c.worst_n);
    let cols = range
        .map(|j| {
            let mut column = SparseVector::new();
            composer.compose_into(mx, mx.column(j), &mut column);
            stats.chaos = stats.chaos.max(inhomogeneity(&column));
            stats.max_expanded = stats.max_expanded.max(column.len());
            prune(&mut column, j, c, &mut backup, &mut stats.prune);
            column
        })
        .collect();
    (cols, stats)
}

/// Square `mx` and prune each column, on the expansion pool if any.
pub fn expand(mx: &SparseMatrix, c: &MclConfig, workers: &Workers) -> (SparseMatrix, ExpandStats) {
    assert!(
        mx.is_square(),
        "expansion of a non-square matrix ({}x{})",
        mx.n_rows(),
        mx.n_cols()
    );
    let (cols, stats) = match workers.expansion() {
        Some((threads, pool)) => {
            let to_clone = c.clone_barrier.map_or(false, |bar| bar < mx.density());
            let ranges = split_ranges(mx.n_cols(), threads);
            let results: Vec<_> = pool.install(|| {
                ranges
                    .into_par_iter()
                    .map(|range| match to_clone {
                        true => expand_range(&mx.clone(), range, &c.prune),
                        false => expand_range(mx, range, &c.prune),
                    })
                    .collect()
            });
            let mut cols = Vec::with_capacity(mx.n_cols());
            let mut stats = ExpandStats::new(c.prune.worst_n);
            for (xs, st) in results {
                cols.extend(xs);
                stats.merge(st);
            }
            (cols, stats)
        }
        None => expand_range(mx, 0..mx.n_cols(), &c.prune),
    };
    (SparseMatrix::from_columns(cols, mx.n_rows()), stats)
}

/// One expansion with pools built just for it.
pub fn expand_once(mx: &SparseMatrix, c: &MclConfig) -> (SparseMatrix, ExpandStats) {
    expand(mx, c, &Workers::new(c))
}
