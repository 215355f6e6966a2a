//! Pruning -- discard small entries of a freshly expanded column.
//!
//! The cut is either fixed (rigid mode) or computed from the column itself (adaptive mode).
//! After the cut, too long columns are shortened by selection, and columns which lost too much
//! are recovered from a backup. A column never becomes empty: as a last resort it gets a self-loop.
use super::config::{PruneConfig, PruningMode};
use definitions::{KthMode, SparseVector};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub const N_LEVELS: usize = 14;
/// Lower bounds of the buckets of the size histogram.
pub const SIZE_LEVELS: [usize; N_LEVELS] = [
    0, 1, 2, 5, 10, 20, 50, 100, 200, 500, 1000, 2000, 5000, 10000,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Loss {
    pub mass: f64,
    pub column: usize,
}

impl Eq for Loss {}
impl PartialOrd for Loss {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Loss {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.mass
            .total_cmp(&other.mass)
            .then(other.column.cmp(&self.column))
    }
}

/// The `n` largest losses seen so far.
#[derive(Debug, Clone, Default)]
pub struct WorstN {
    n: usize,
    heap: BinaryHeap<Reverse<Loss>>,
}

impl WorstN {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            heap: BinaryHeap::with_capacity(n + 1),
        }
    }
    pub fn push(&mut self, loss: Loss) {
        if self.heap.len() < self.n {
            self.heap.push(Reverse(loss));
        } else if matches!(self.heap.peek(), Some(Reverse(min)) if *min < loss) {
            self.heap.pop();
            self.heap.push(Reverse(loss));
        }
    }
    pub fn merge(&mut self, other: WorstN) {
        for Reverse(loss) in other.heap {
            self.push(loss);
        }
    }
    /// The losses, the largest first.
    pub fn to_sorted_vec(&self) -> Vec<Loss> {
        let mut losses: Vec<_> = self.heap.iter().map(|x| x.0).collect();
        losses.sort_by(|a, b| b.cmp(a));
        losses
    }
}

#[derive(Debug, Clone, Default)]
pub struct PruneStats {
    pub columns: usize,
    /// Columns cut by selection.
    pub selected: usize,
    /// Columns restored by recovery.
    pub recovered: usize,
    /// Columns which got the emergency self-loop.
    pub emergency: Vec<usize>,
    /// Total mass kept, summed over the columns.
    pub kept_mass: f64,
    /// Total mass before pruning, summed over the columns.
    pub total_mass: f64,
    pub worst_prune: WorstN,
    pub worst_select: WorstN,
    /// Counts of the column sizes, bucketed by [SIZE_LEVELS].
    pub size_histogram: [usize; N_LEVELS],
}

impl PruneStats {
    pub fn new(worst_n: usize) -> Self {
        Self {
            worst_prune: WorstN::new(worst_n),
            worst_select: WorstN::new(worst_n),
            ..Default::default()
        }
    }
    fn record_size(&mut self, size: usize) {
        let bucket = SIZE_LEVELS.iter().rposition(|&level| level <= size);
        self.size_histogram[bucket.unwrap_or(0)] += 1;
    }
    pub fn merge(&mut self, other: PruneStats) {
        self.columns += other.columns;
        self.selected += other.selected;
        self.recovered += other.recovered;
        self.emergency.extend(other.emergency);
        self.kept_mass += other.kept_mass;
        self.total_mass += other.total_mass;
        self.worst_prune.merge(other.worst_prune);
        self.worst_select.merge(other.worst_select);
        std::iter::zip(self.size_histogram.iter_mut(), other.size_histogram)
            .for_each(|(x, y)| *x += y);
    }
    pub fn kept_fraction(&self) -> f64 {
        match 0f64 < self.total_mass {
            true => self.kept_mass / self.total_mass,
            false => 1f64,
        }
    }
}

impl std::fmt::Display for PruneStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{:.4}",
            self.columns,
            self.selected,
            self.recovered,
            self.emergency.len(),
            self.kept_fraction()
        )?;
        let hist: Vec<_> = self.size_histogram.iter().map(|x| format!("{x}")).collect();
        write!(f, "\t[{}]", hist.join(","))
    }
}

/// The threshold for a column before any selection.
pub fn threshold(v: &SparseVector, c: &PruneConfig) -> f64 {
    let floor = c.precision.unwrap_or(0f64);
    match c.mode {
        PruningMode::Rigid => floor,
        PruningMode::Adaptive => {
            let max = v.max_value();
            if max <= 0f64 {
                return floor;
            }
            let center = v.center();
            let ratio = (center / max).powf(c.adaptive_cutoff_exponent);
            let cut = center * ratio / c.adaptive_cutoff_factor;
            cut.max(floor)
        }
    }
}

/// The bar keeping about `keep` largest values of `v`.
fn selection_bar(v: &SparseVector, keep: usize) -> f64 {
    let n = v.len();
    if 2 * keep <= n {
        v.kth_order_value(keep, None, KthMode::Large)
    } else {
        v.kth_order_value(n - keep + 1, None, KthMode::Small)
    }
}

/// Prune `v`, the expanded `column`-th column, in place.
/// `backup` is scratch space reused across calls.
pub fn prune(
    v: &mut SparseVector,
    column: usize,
    c: &PruneConfig,
    backup: &mut SparseVector,
    stats: &mut PruneStats,
) {
    let total = v.sum();
    let recover_target = c
        .recover_number
        .map(|r| c.select_number.map_or(r, |s| r.min(s)));
    if recover_target.is_some() {
        backup.copy_from(v);
    }
    let mut cut = threshold(v, c);
    let mut kept = v.select_at_or_above(cut);
    stats.worst_prune.push(Loss {
        mass: total - kept,
        column,
    });
    if let Some(select) = c.select_number.filter(|&s| s < v.len()) {
        let before = kept;
        cut = cut.max(selection_bar(v, select));
        kept = v.select_at_or_above(cut);
        stats.selected += 1;
        stats.worst_select.push(Loss {
            mass: before - kept,
            column,
        });
    }
    let lost_too_much = 0f64 < total && kept / total < c.recover_mass_pct;
    if let Some(target) = recover_target.filter(|&r| v.len() < r && lost_too_much) {
        let need = target - v.len();
        let bar = backup.kth_order_value(need, Some(cut), KthMode::Large);
        std::mem::swap(v, backup);
        kept = v.select_at_or_above(bar.min(cut));
        stats.recovered += 1;
    }
    if v.is_empty() {
        warn!("PRUNE\tEmergency\t{column}");
        v.push(column, 1f64);
        stats.emergency.push(column);
    }
    stats.columns += 1;
    stats.kept_mass += kept;
    stats.total_mass += total;
    stats.record_size(v.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;
    fn gen_stochastic<R: Rng>(rng: &mut R, len: usize) -> SparseVector {
        let mut v = SparseVector::from_pairs((0..len).map(|i| (i, rng.gen_range(0.0001..1f64))));
        v.normalize();
        v
    }
    #[test]
    fn rigid_cut() {
        let c = PruneConfig::new(PruningMode::Rigid, Some(0.1), None, None, 0.9);
        let mut v = SparseVector::from_pairs(vec![(0, 0.05), (1, 0.5), (2, 0.45)]);
        let (mut backup, mut stats) = (SparseVector::new(), PruneStats::new(3));
        prune(&mut v, 0, &c, &mut backup, &mut stats);
        assert_eq!(v.indices().collect::<Vec<_>>(), vec![1, 2]);
        assert!((stats.kept_fraction() - 0.95).abs() < 1e-12);
        let worst = stats.worst_prune.to_sorted_vec();
        assert_eq!(worst[0].column, 0);
        assert!((worst[0].mass - 0.05).abs() < 1e-12);
    }
    #[test]
    fn no_precision_keeps_all() {
        let c = PruneConfig::exact();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(32);
        let mut v = gen_stochastic(&mut rng, 100);
        let answer = v.clone();
        let (mut backup, mut stats) = (SparseVector::new(), PruneStats::new(3));
        prune(&mut v, 0, &c, &mut backup, &mut stats);
        assert_eq!(v, answer);
    }
    #[test]
    fn adaptive_threshold() {
        let c = PruneConfig::exact().adaptive(2f64, 1f64);
        let v = SparseVector::from_pairs(vec![(0, 0.5), (1, 0.25), (2, 0.25)]);
        let center = 0.25 + 0.0625 + 0.0625;
        let expected = center * (center / 0.5) / 2f64;
        assert!((threshold(&v, &c) - expected).abs() < 1e-12);
        let c = PruneConfig::new(PruningMode::Adaptive, Some(0.3), None, None, 0.9);
        assert_eq!(threshold(&v, &c), 0.3);
    }
    #[test]
    fn selection_keeps_largest() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(4820);
        for select in [3, 10, 60, 99] {
            let c = PruneConfig::new(PruningMode::Rigid, None, Some(select), None, 0.9);
            let mut v = gen_stochastic(&mut rng, 100);
            let original = v.clone();
            let (mut backup, mut stats) = (SparseVector::new(), PruneStats::new(3));
            prune(&mut v, 4, &c, &mut backup, &mut stats);
            assert_eq!(v.len(), select);
            assert_eq!(stats.selected, 1);
            let dropped = original.set_minus(&v);
            assert!(dropped.max_value() <= v.min_value().unwrap());
        }
    }
    #[test]
    fn recovery() {
        // Uniform column: the precision cuts everything.
        let mut v = SparseVector::from_pairs((0..50).map(|i| (i, 0.02)));
        let c = PruneConfig::new(PruningMode::Rigid, Some(0.05), None, Some(10), 0.9);
        let (mut backup, mut stats) = (SparseVector::new(), PruneStats::new(3));
        prune(&mut v, 0, &c, &mut backup, &mut stats);
        // All values tie, so all of them come back.
        assert_eq!(v.len(), 50);
        assert_eq!(stats.recovered, 1);
        // Distinct values.
        let mut v = SparseVector::from_pairs((0..50).map(|i| (i, 1f64 + i as f64)));
        v.normalize();
        let cut = v.get(45).unwrap();
        let c = PruneConfig::new(PruningMode::Rigid, Some(cut), None, Some(10), 0.9);
        let mut stats = PruneStats::new(3);
        prune(&mut v, 0, &c, &mut backup, &mut stats);
        assert_eq!(v.len(), 10);
        assert_eq!(v.indices().collect::<Vec<_>>(), (40..50).collect::<Vec<_>>());
        assert_eq!(stats.recovered, 1);
    }
    #[test]
    fn emergency_loop() {
        let mut v = SparseVector::from_pairs(vec![(0, 0.5), (1, 0.5)]);
        let c = PruneConfig::new(PruningMode::Rigid, Some(0.9), None, None, 0.9);
        let (mut backup, mut stats) = (SparseVector::new(), PruneStats::new(3));
        prune(&mut v, 7, &c, &mut backup, &mut stats);
        assert_eq!(v, SparseVector::singleton(7, 1f64));
        assert_eq!(stats.emergency, vec![7]);
    }
    #[test]
    fn worst_n_and_merge() {
        let mut worst = WorstN::new(2);
        for (column, mass) in [(0, 0.1), (1, 0.5), (2, 0.3)] {
            worst.push(Loss { mass, column });
        }
        let mut other = WorstN::new(2);
        other.push(Loss {
            mass: 0.4,
            column: 3,
        });
        worst.merge(other);
        let columns: Vec<_> = worst.to_sorted_vec().iter().map(|x| x.column).collect();
        assert_eq!(columns, vec![1, 3]);
    }
    #[test]
    fn histogram() {
        let mut stats = PruneStats::new(1);
        for size in [0, 1, 3, 4, 12000] {
            stats.record_size(size);
        }
        assert_eq!(stats.size_histogram[0], 1);
        assert_eq!(stats.size_histogram[1], 1);
        assert_eq!(stats.size_histogram[2], 2);
        assert_eq!(stats.size_histogram[13], 1);
    }
}
