//! Thread pools for the expansion and the inflation.
//!
//! The pools are built once per run and reused by every iteration. The columns are split into
//! `T` contiguous ranges of `n / T` columns, the remainder going to the last range, and each range
//! is processed by one task. The tasks write only to their own ranges.
use super::config::MclConfig;
use rayon::ThreadPool;
use std::ops::Range;

#[derive(Default)]
pub struct Workers {
    expansion: Option<(usize, ThreadPool)>,
    inflation: Option<(usize, ThreadPool)>,
}

impl std::fmt::Debug for Workers {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Workers(expansion:{},inflation:{})",
            self.expansion_threads(),
            self.inflation_threads()
        )
    }
}

fn build_pool(threads: usize) -> Option<(usize, ThreadPool)> {
    if threads <= 1 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some((threads, pool)),
        Err(why) => {
            warn!("POOL\t{threads}\t{why:?}\tFallback to the current thread.");
            None
        }
    }
}

impl Workers {
    pub fn new(c: &MclConfig) -> Self {
        Self {
            expansion: build_pool(c.expansion_threads),
            inflation: build_pool(c.inflation_threads),
        }
    }
    /// No pool; everything runs on the current thread.
    pub fn serial() -> Self {
        Self::default()
    }
    pub fn expansion(&self) -> Option<(usize, &ThreadPool)> {
        self.expansion.as_ref().map(|(t, pool)| (*t, pool))
    }
    pub fn inflation(&self) -> Option<(usize, &ThreadPool)> {
        self.inflation.as_ref().map(|(t, pool)| (*t, pool))
    }
    pub fn expansion_threads(&self) -> usize {
        self.expansion.as_ref().map_or(1, |x| x.0)
    }
    pub fn inflation_threads(&self) -> usize {
        self.inflation.as_ref().map_or(1, |x| x.0)
    }
}

/// Split `0..n` into `parts` contiguous ranges. The remainder goes to the last range.
pub fn split_ranges(n: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, n.max(1));
    let size = n / parts;
    (0..parts)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == parts { n } else { start + size };
            start..end
        })
        .collect()
}

/// Split `xs` into disjoint mutable pieces along [split_ranges], with their offsets.
pub fn split_mut<T>(xs: &mut [T], parts: usize) -> Vec<(usize, &mut [T])> {
    let ranges = split_ranges(xs.len(), parts);
    let mut pieces = Vec::with_capacity(ranges.len());
    let mut rest = xs;
    for range in ranges {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        pieces.push((range.start, head));
        rest = tail;
    }
    pieces
}
