//! Enstrict -- make a clustering a partition.
use super::config::EnstrictFlags;
use definitions::{Clustering, SparseVector};

/// The defects found in a clustering. The numbers are counted before any repair,
/// except `empty`, which is counted after the overlap is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnstrictCounts {
    /// Nodes in more than one cluster.
    pub overlap: usize,
    /// Nodes in no cluster.
    pub missing: usize,
    /// Empty clusters.
    pub empty: usize,
}

impl EnstrictCounts {
    pub fn is_partition(&self) -> bool {
        self.overlap == 0 && self.missing == 0 && self.empty == 0
    }
}

impl std::fmt::Display for EnstrictCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}\t{}\t{}", self.overlap, self.missing, self.empty)
    }
}

/// Count and, as `flags` says, repair the overlap, the missing nodes, and the empty clusters.
/// A node in several clusters stays in the first one.
pub fn enstrict(cl: &mut Clustering, flags: &EnstrictFlags) -> EnstrictCounts {
    let n = cl.n_rows();
    let mut occurrences = vec![0usize; n];
    for col in cl.columns() {
        for idx in col.indices() {
            occurrences[idx] += 1;
        }
    }
    let overlap = occurrences.iter().filter(|&&x| 1 < x).count();
    let missing: Vec<_> = (0..n).filter(|&i| occurrences[i] == 0).collect();
    if flags.repair_overlap && 0 < overlap {
        let mut seen = vec![false; n];
        for col in cl.columns_mut() {
            col.mutate(|idx, val| match seen[idx] {
                true => *val = -1f64,
                false => seen[idx] = true,
            });
            col.select_at_or_above(0f64);
        }
    }
    let empty = cl.columns().iter().filter(|c| c.is_empty()).count();
    let counts = EnstrictCounts {
        overlap,
        missing: missing.len(),
        empty,
    };
    if flags.repair_empty && 0 < empty {
        cl.retain_columns(|c| !c.is_empty());
    }
    if flags.repair_missing && !missing.is_empty() {
        let column = SparseVector::from_pairs(missing.into_iter().map(|i| (i, 1f64)));
        cl.push_column(column);
    }
    if !counts.is_partition() {
        debug!("ENSTRICT\t{}", counts);
    }
    counts
}
