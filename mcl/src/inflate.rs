//! Inflation -- raise every entry to a power and normalize.
use super::workers::{split_mut, Workers};
use definitions::{SparseMatrix, SparseVector};
use rayon::prelude::*;

/// Raise each value of `v` to `power`, then normalize.
/// Return the sum of the powered values before normalization.
/// If the sum is not positive, `v` is cleared (the return value tells it).
pub fn inflate(v: &mut SparseVector, power: f64) -> f64 {
    if power == 2f64 {
        v.values_mut().for_each(|x| *x *= *x);
    } else if power != 1f64 {
        v.values_mut().for_each(|x| *x = x.powf(power));
    }
    let pow_sum = v.sum();
    v.normalize();
    pow_sum
}

#[derive(Debug, Clone, Default)]
pub struct InflateStats {
    /// Columns cleared because nothing was left after raising to the power.
    pub cleared: Vec<usize>,
}

fn inflate_range(offset: usize, cols: &mut [SparseVector], power: f64) -> InflateStats {
    let mut stats = InflateStats::default();
    for (i, col) in cols.iter_mut().enumerate() {
        let was_empty = col.is_empty();
        inflate(col, power);
        if !was_empty && col.is_empty() {
            stats.cleared.push(offset + i);
        }
    }
    stats
}

/// Inflate every column of `mx`, on the inflation pool if any.
pub fn inflate_matrix(mx: &mut SparseMatrix, power: f64, workers: &Workers) -> InflateStats {
    let mut stats = match workers.inflation() {
        Some((threads, pool)) => {
            let pieces = split_mut(mx.columns_mut(), threads);
            let results: Vec<_> = pool.install(|| {
                pieces
                    .into_par_iter()
                    .map(|(offset, cols)| inflate_range(offset, cols, power))
                    .collect()
            });
            results
                .into_iter()
                .fold(InflateStats::default(), |mut acc, x| {
                    acc.cleared.extend(x.cleared);
                    acc
                })
        }
        None => inflate_range(0, mx.columns_mut(), power),
    };
    stats.cleared.sort_unstable();
    if !stats.cleared.is_empty() {
        warn!("INFLATE\t{}\tColumns cleared", stats.cleared.len());
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MclConfig;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;
    fn gen_vector<R: Rng>(rng: &mut R) -> SparseVector {
        let len = rng.gen_range(1..30);
        SparseVector::from_pairs((0..len).map(|_| (rng.gen_range(0..50), rng.gen_range(0.01..1f64))))
    }
    #[test]
    fn power_one_is_normalization() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(2130);
        for _ in 0..50 {
            let v = gen_vector(&mut rng);
            let (mut inflated, mut normalized) = (v.clone(), v.clone());
            let pow_sum = inflate(&mut inflated, 1f64);
            assert!((pow_sum - v.sum()).abs() < 1e-12);
            inflated.normalize();
            normalized.normalize();
            for (x, y) in std::iter::zip(inflated.iter(), normalized.iter()) {
                assert_eq!(x.idx, y.idx);
                assert!((x.val - y.val).abs() < 1e-12);
            }
        }
    }
    #[test]
    fn sharpens() {
        let mut v = SparseVector::from_pairs(vec![(0, 0.75), (1, 0.25)]);
        let pow_sum = inflate(&mut v, 2f64);
        assert!((pow_sum - 0.625).abs() < 1e-12);
        assert!((v.get(0).unwrap() - 0.9).abs() < 1e-12);
        assert!((v.get(1).unwrap() - 0.1).abs() < 1e-12);
    }
    #[test]
    fn zero_column_is_cleared() {
        let mut v = SparseVector::from_pairs(vec![(0, 0f64), (3, 0f64)]);
        assert_eq!(inflate(&mut v, 3f64), 0f64);
        assert!(v.is_empty());
    }
    #[test]
    fn overflowing_column_is_cleared() {
        let cols = vec![
            SparseVector::from_pairs(vec![(0, 1e200), (1, 1f64)]),
            SparseVector::from_pairs(vec![(0, 0.5), (1, 0.5)]),
            SparseVector::new(),
        ];
        let mut mx = SparseMatrix::from_columns(cols, 2);
        let stats = inflate_matrix(&mut mx, 2f64, &Workers::serial());
        assert_eq!(stats.cleared, vec![0]);
        assert!(mx.column(0).is_empty());
        assert_eq!(mx.column(1).get(0), Some(0.5));
    }
    #[test]
    fn threaded_matches_serial() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(43);
        let cols: Vec<_> = (0..37).map(|_| gen_vector(&mut rng)).collect();
        let mx = SparseMatrix::from_columns(cols, 50);
        let mut serial = mx.clone();
        inflate_matrix(&mut serial, 2.5, &Workers::serial());
        let mut threaded = mx;
        let workers = Workers::new(&MclConfig::default().threads(1, 4));
        inflate_matrix(&mut threaded, 2.5, &workers);
        assert_eq!(serial, threaded);
        for col in serial.columns() {
            assert!((col.sum() - 1f64).abs() < 1e-10);
        }
    }
}
