//! Sparse vector -- a sorted list of index-value pairs.
//!
//! All the algorithms merging two vectors walk both of them once from the smallest index,
//! so the indices should be strictly ascending. The constructors keep this invariant,
//! and the operations never break it.
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Index-value pair. One non-zero entry of a sparse vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ivp {
    pub idx: usize,
    pub val: f64,
}

impl Ivp {
    pub fn new(idx: usize, val: f64) -> Self {
        Self { idx, val }
    }
}

/// Which end of the value distribution [SparseVector::kth_order_value] looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KthMode {
    /// The k-th largest value. Values at or above the bound are ignored.
    Large,
    /// The k-th smallest value. Values below the bound are ignored.
    Small,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    ivps: Vec<Ivp>,
}

// Total order on f64 for the bounded heaps.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);
impl Eq for OrdF64 {}
impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ivps: Vec::with_capacity(capacity),
        }
    }
    /// Wrap already sorted, deduplicated pairs.
    /// The order is checked only in debug builds.
    pub fn from_sorted(ivps: Vec<Ivp>) -> Self {
        debug_assert!(ivps.windows(2).all(|w| w[0].idx < w[1].idx));
        Self { ivps }
    }
    /// Build a vector from arbitrary (index, value) pairs.
    /// The pairs are sorted and the values of duplicated indices are summed up.
    pub fn from_pairs<I: IntoIterator<Item = (usize, f64)>>(pairs: I) -> Self {
        let mut pairs: Vec<_> = pairs.into_iter().collect();
        pairs.sort_by_key(|x| x.0);
        let mut ivps: Vec<Ivp> = Vec::with_capacity(pairs.len());
        for (idx, val) in pairs {
            match ivps.last_mut() {
                Some(last) if last.idx == idx => last.val += val,
                _ => ivps.push(Ivp::new(idx, val)),
            }
        }
        Self { ivps }
    }
    pub fn singleton(idx: usize, val: f64) -> Self {
        Self {
            ivps: vec![Ivp::new(idx, val)],
        }
    }
    pub fn len(&self) -> usize {
        self.ivps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ivps.is_empty()
    }
    pub fn ivps(&self) -> &[Ivp] {
        &self.ivps
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Ivp> {
        self.ivps.iter()
    }
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.ivps.iter().map(|x| x.idx)
    }
    /// Mutable access to the values. The indices can not be changed through it.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut f64> + '_ {
        self.ivps.iter_mut().map(|x| &mut x.val)
    }
    /// Mutate every value together with its index.
    pub fn mutate<F: FnMut(usize, &mut f64)>(&mut self, mut f: F) {
        self.ivps.iter_mut().for_each(|x| f(x.idx, &mut x.val));
    }
    /// Append an entry. The index should be larger than any index in the vector.
    pub fn push(&mut self, idx: usize, val: f64) {
        if let Some(last) = self.ivps.last() {
            assert!(last.idx < idx, "push {} after {}", idx, last.idx);
        }
        self.ivps.push(Ivp::new(idx, val));
    }
    /// Insert or overwrite the value at `idx`.
    pub fn set(&mut self, idx: usize, val: f64) {
        match self.ivps.binary_search_by_key(&idx, |x| x.idx) {
            Ok(pos) => self.ivps[pos].val = val,
            Err(pos) => self.ivps.insert(pos, Ivp::new(idx, val)),
        }
    }
    pub fn get(&self, idx: usize) -> Option<f64> {
        self.ivps
            .binary_search_by_key(&idx, |x| x.idx)
            .ok()
            .map(|pos| self.ivps[pos].val)
    }
    pub fn contains(&self, idx: usize) -> bool {
        self.get(idx).is_some()
    }
    pub fn clear(&mut self) {
        self.ivps.clear();
    }
    /// Replace the contents by `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &SparseVector) {
        self.ivps.clear();
        self.ivps.extend_from_slice(&other.ivps);
    }
    pub fn sum(&self) -> f64 {
        self.ivps.iter().map(|x| x.val).sum()
    }
    pub fn pow_sum(&self, power: f64) -> f64 {
        if power == 2f64 {
            self.ivps.iter().map(|x| x.val * x.val).sum()
        } else {
            self.ivps.iter().map(|x| x.val.powf(power)).sum()
        }
    }
    /// The sum of squares. For a stochastic vector it is the expected value
    /// of an entry drawn by its own weight.
    pub fn center(&self) -> f64 {
        self.pow_sum(2f64)
    }
    /// The maximum value, or zero if the vector is empty.
    pub fn max_value(&self) -> f64 {
        self.ivps.iter().map(|x| x.val).fold(0f64, f64::max)
    }
    pub fn min_value(&self) -> Option<f64> {
        self.ivps.iter().map(|x| x.val).reduce(f64::min)
    }
    /// The value at `idx`, zero if absent.
    pub fn self_value(&self, idx: usize) -> f64 {
        self.get(idx).unwrap_or(0f64)
    }
    /// Make the values sum up to one.
    /// If the sum is not positive, the vector is cleared and false is returned.
    pub fn normalize(&mut self) -> bool {
        let sum = self.sum();
        if sum <= 0f64 || !sum.is_finite() {
            self.ivps.clear();
            false
        } else {
            self.ivps.iter_mut().for_each(|x| x.val /= sum);
            true
        }
    }
    /// Divide every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        assert!(0f64 < factor, "scale by non-positive factor {}", factor);
        self.ivps.iter_mut().for_each(|x| x.val /= factor);
    }
    /// Keep the entries with a value at least `bar`, preserving the order.
    /// Return the retained mass.
    pub fn select_at_or_above(&mut self, bar: f64) -> f64 {
        let mut mass = 0f64;
        self.ivps.retain(|x| {
            let keep = bar <= x.val;
            if keep {
                mass += x.val;
            }
            keep
        });
        mass
    }
    /// Set every value to one.
    pub fn make_characteristic(&mut self) {
        self.ivps.iter_mut().for_each(|x| x.val = 1f64);
    }
    /// Combine two vectors in one merge pass.
    /// `rule` gets the values at the same index (None if absent) and returns
    /// the value to keep, or None to drop the index.
    pub fn combine<F>(&self, other: &SparseVector, mut rule: F) -> SparseVector
    where
        F: FnMut(Option<f64>, Option<f64>) -> Option<f64>,
    {
        let mut result = Vec::with_capacity(self.len().max(other.len()));
        let (mut i, mut j) = (0, 0);
        let (xs, ys) = (&self.ivps, &other.ivps);
        while i < xs.len() || j < ys.len() {
            let (idx, a, b) = match (xs.get(i), ys.get(j)) {
                (Some(x), Some(y)) if x.idx == y.idx => {
                    i += 1;
                    j += 1;
                    (x.idx, Some(x.val), Some(y.val))
                }
                (Some(x), Some(y)) if x.idx < y.idx => {
                    i += 1;
                    (x.idx, Some(x.val), None)
                }
                (Some(_), Some(y)) => {
                    j += 1;
                    (y.idx, None, Some(y.val))
                }
                (Some(x), None) => {
                    i += 1;
                    (x.idx, Some(x.val), None)
                }
                (None, Some(y)) => {
                    j += 1;
                    (y.idx, None, Some(y.val))
                }
                (None, None) => unreachable!(),
            };
            if let Some(val) = rule(a, b) {
                result.push(Ivp::new(idx, val));
            }
        }
        SparseVector { ivps: result }
    }
    /// Indices present in both. Values are taken from `self`.
    pub fn set_meet(&self, other: &SparseVector) -> SparseVector {
        self.combine(other, |a, b| match (a, b) {
            (Some(a), Some(_)) => Some(a),
            _ => None,
        })
    }
    /// Indices present in either. Values of `self` win.
    pub fn set_merge(&self, other: &SparseVector) -> SparseVector {
        self.combine(other, |a, b| a.or(b))
    }
    /// Indices present in `self` but not in `other`.
    pub fn set_minus(&self, other: &SparseVector) -> SparseVector {
        self.combine(other, |a, b| match b {
            Some(_) => None,
            None => a,
        })
    }
    pub fn add(&self, other: &SparseVector) -> SparseVector {
        self.combine(other, |a, b| Some(a.unwrap_or(0f64) + b.unwrap_or(0f64)))
    }
    pub fn max(&self, other: &SparseVector) -> SparseVector {
        self.combine(other, |a, b| Some(a.unwrap_or(0f64).max(b.unwrap_or(0f64))))
    }
    pub fn hadamard(&self, other: &SparseVector) -> SparseVector {
        self.combine(other, |a, b| Some(a? * b?))
    }
    /// The `k`-th largest (`KthMode::Large`) or smallest (`KthMode::Small`) value.
    ///
    /// In `Large` mode values at or above `ignore` are not considered,
    /// in `Small` mode values below `ignore` are not considered.
    /// Uses a heap bounded by `k`, so it runs in O(n log k).
    ///
    /// Returns -1 if `k` is not smaller than the length of the vector, or if fewer than `k`
    /// values pass the bound. In both cases selecting at or above the result keeps everything.
    /// For `k == 0`, `Large` returns infinity (keep nothing).
    pub fn kth_order_value(&self, k: usize, ignore: Option<f64>, mode: KthMode) -> f64 {
        if k >= self.len() {
            return -1f64;
        }
        match mode {
            KthMode::Large => {
                if k == 0 {
                    return f64::INFINITY;
                }
                let bound = ignore.unwrap_or(f64::INFINITY);
                let mut heap: BinaryHeap<Reverse<OrdF64>> = BinaryHeap::with_capacity(k + 1);
                for val in self.ivps.iter().map(|x| x.val).filter(|&x| x < bound) {
                    if heap.len() < k {
                        heap.push(Reverse(OrdF64(val)));
                    } else if let Some(Reverse(OrdF64(min))) = heap.peek() {
                        if *min < val {
                            heap.pop();
                            heap.push(Reverse(OrdF64(val)));
                        }
                    }
                }
                match heap.len() == k {
                    true => heap.peek().map(|x| x.0 .0).unwrap_or(-1f64),
                    false => -1f64,
                }
            }
            KthMode::Small => {
                if k == 0 {
                    return -1f64;
                }
                let bound = ignore.unwrap_or(f64::NEG_INFINITY);
                let mut heap: BinaryHeap<OrdF64> = BinaryHeap::with_capacity(k + 1);
                for val in self.ivps.iter().map(|x| x.val).filter(|&x| bound <= x) {
                    if heap.len() < k {
                        heap.push(OrdF64(val));
                    } else if let Some(OrdF64(max)) = heap.peek() {
                        if val < *max {
                            heap.pop();
                            heap.push(OrdF64(val));
                        }
                    }
                }
                match heap.len() == k {
                    true => heap.peek().map(|x| x.0).unwrap_or(-1f64),
                    false => -1f64,
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a SparseVector {
    type Item = &'a Ivp;
    type IntoIter = std::slice::Iter<'a, Ivp>;
    fn into_iter(self) -> Self::IntoIter {
        self.ivps.iter()
    }
}

impl std::fmt::Display for SparseVector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let entries: Vec<_> = self
            .ivps
            .iter()
            .map(|x| format!("{}:{}", x.idx, x.val))
            .collect();
        write!(f, "{}", entries.join(" "))
    }
}
