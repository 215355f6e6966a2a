//! The expand-prune-inflate loop and the whole clustering pipeline.
use super::config::MclConfig;
use super::enstrict::{enstrict, EnstrictCounts};
use super::expand::expand;
use super::inflate::inflate_matrix;
use super::interpret::interpret;
use super::prune::PruneStats;
use super::workers::Workers;
use definitions::{Clustering, SparseMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MclState {
    Init,
    /// The initial phase, with the number of iterations done so far.
    InitialPhase(usize),
    /// The main phase, with the number of iterations done so far.
    MainPhase(usize),
    Converged,
    Exhausted,
    Interpreted,
}

impl MclState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MclState::Converged | MclState::Exhausted | MclState::Interpreted
        )
    }
}

#[derive(Debug, Clone)]
pub struct MclReport {
    pub state: MclState,
    /// True if the loop stopped because the matrix converged.
    pub converged: bool,
    pub initial_iterations: usize,
    pub main_iterations: usize,
    /// The inhomogeneity of each iteration.
    pub chaos: Vec<f64>,
    /// Pruning statistics of the last iteration.
    pub last_prune: PruneStats,
    /// Emergency self-loops over all the iterations.
    pub emergency: usize,
    /// Columns cleared by inflation over all the iterations.
    pub inflation_cleared: usize,
    /// Input columns which could not be made stochastic.
    pub stochastic_fallbacks: Vec<usize>,
    pub enstrict: Option<EnstrictCounts>,
}

impl MclReport {
    fn new(worst_n: usize) -> Self {
        Self {
            state: MclState::Init,
            converged: false,
            initial_iterations: 0,
            main_iterations: 0,
            chaos: vec![],
            last_prune: PruneStats::new(worst_n),
            emergency: 0,
            inflation_cleared: 0,
            stochastic_fallbacks: vec![],
            enstrict: None,
        }
    }
    pub fn iterations(&self) -> usize {
        self.initial_iterations + self.main_iterations
    }
}

// One expansion and one inflation. Return the chaos.
fn iterate(
    mx: &mut SparseMatrix,
    power: f64,
    c: &MclConfig,
    workers: &Workers,
    report: &mut MclReport,
) -> f64 {
    let (mut next, stats) = expand(mx, c, workers);
    let inflated = inflate_matrix(&mut next, power, workers);
    debug!(
        "MCL\t{}\t{:.6}\t{}\t{}\t{}",
        report.iterations(),
        stats.chaos,
        stats.max_expanded,
        next.nnz(),
        stats.prune
    );
    report.chaos.push(stats.chaos);
    report.emergency += stats.prune.emergency.len();
    report.inflation_cleared += inflated.cleared.len();
    report.last_prune = stats.prune;
    *mx = next;
    stats.chaos
}

/// Iterate on a column stochastic matrix until it converges or the main loop runs out.
/// The returned report is in either [MclState::Converged] or [MclState::Exhausted].
pub fn process(mx: SparseMatrix, c: &MclConfig) -> (SparseMatrix, MclReport) {
    let workers = Workers::new(c);
    debug!("MCL\tStart\t{}\t{}\t{:?}", mx.n_cols(), mx.nnz(), workers);
    let mut report = MclReport::new(c.prune.worst_n);
    let mut mx = mx;
    let mut state = MclState::Init;
    while !state.is_terminal() {
        state = match state {
            MclState::Init if 0 < c.init_loop_length => MclState::InitialPhase(0),
            MclState::Init => MclState::MainPhase(0),
            MclState::InitialPhase(i) if c.init_loop_length <= i => MclState::MainPhase(0),
            MclState::InitialPhase(i) => {
                iterate(&mut mx, c.init_inflation, c, &workers, &mut report);
                report.initial_iterations += 1;
                MclState::InitialPhase(i + 1)
            }
            MclState::MainPhase(i) if c.main_loop_length.map_or(false, |len| len <= i) => {
                MclState::Exhausted
            }
            MclState::MainPhase(i) => {
                let chaos = iterate(&mut mx, c.main_inflation, c, &workers, &mut report);
                report.main_iterations += 1;
                match chaos < c.inhomogeneity_stop {
                    true => MclState::Converged,
                    false => MclState::MainPhase(i + 1),
                }
            }
            MclState::Converged | MclState::Exhausted | MclState::Interpreted => {
                unreachable!()
            }
        };
    }
    report.state = state;
    report.converged = state == MclState::Converged;
    if !report.converged {
        warn!("MCL\tExhausted\t{}", report.iterations());
    }
    (mx, report)
}

pub trait MarkovClustering {
    /// Cluster the graph, a square matrix whose `j`-th column is the out-weights of node `j`.
    fn markov_clustering(&self, c: &MclConfig) -> (Clustering, MclReport);
}

impl MarkovClustering for SparseMatrix {
    fn markov_clustering(&self, c: &MclConfig) -> (Clustering, MclReport) {
        assert!(
            self.is_square(),
            "clustering a non-square matrix ({}x{})",
            self.n_rows(),
            self.n_cols()
        );
        let mut mx = self.clone();
        if c.adjust_loops {
            mx.add_loops(None);
        }
        let fallbacks = mx.make_stochastic();
        if !fallbacks.is_empty() {
            warn!("MCL\t{}\tColumns could not be normalized", fallbacks.len());
        }
        let (converged, mut report) = process(mx, c);
        report.stochastic_fallbacks = fallbacks;
        let mut clustering = interpret(&converged, &c.interpret);
        let counts = enstrict(&mut clustering, &c.enstrict);
        clustering.sort_columns_by_size();
        report.enstrict = Some(counts);
        report.state = MclState::Interpreted;
        debug!(
            "MCL\tDone\t{}\t{}\t{}\t{}",
            report.iterations(),
            report.converged,
            clustering.n_cols(),
            counts
        );
        (clustering, report)
    }
}

/// Cluster `mx` and drop the report.
pub fn cluster(mx: &SparseMatrix, c: &MclConfig) -> Clustering {
    mx.markov_clustering(c).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{seq::SliceRandom, Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;
    fn two_triangles() -> SparseMatrix {
        let mut triplets = vec![];
        for tri in [[0, 1, 2], [3, 4, 5]] {
            for &j in tri.iter() {
                triplets.extend(tri.iter().map(|&i| (j, i, 1f64)));
            }
        }
        SparseMatrix::from_triplets(6, 6, triplets)
    }
    fn path(n: usize) -> SparseMatrix {
        let mut triplets = vec![];
        for j in 0..n {
            triplets.push((j, j, 1f64));
            if 0 < j {
                triplets.push((j, j - 1, 1f64));
                triplets.push((j - 1, j, 1f64));
            }
        }
        SparseMatrix::from_triplets(n, n, triplets)
    }
    // Dense blocks of the given sizes, with a few light edges between them.
    fn gen_blocks<R: Rng>(rng: &mut R, sizes: &[usize]) -> (SparseMatrix, Vec<usize>) {
        let block: Vec<usize> = sizes
            .iter()
            .enumerate()
            .flat_map(|(b, &size)| std::iter::repeat(b).take(size))
            .collect();
        let n = block.len();
        let mut triplets = vec![];
        for j in 0..n {
            for i in (0..j).filter(|&i| block[i] == block[j]) {
                if rng.gen_bool(0.8) {
                    let w = rng.gen_range(0.5..1f64);
                    triplets.push((j, i, w));
                    triplets.push((i, j, w));
                }
            }
            let i = rng.gen_range(0..n);
            if block[i] != block[j] {
                triplets.push((j, i, 0.05));
                triplets.push((i, j, 0.05));
            }
        }
        let mut mx = SparseMatrix::from_triplets(n, n, triplets);
        mx.add_loops(None);
        (mx, block)
    }
    #[test]
    fn two_triangles_are_two_clusters() {
        let (clustering, report) = two_triangles().markov_clustering(&MclConfig::default());
        assert_eq!(clustering.members(), vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert_eq!(report.state, MclState::Interpreted);
        assert!(report.converged);
        assert!(report.enstrict.unwrap().is_partition());
    }
    #[test]
    fn single_node() {
        let mx = SparseMatrix::identity(1);
        let clustering = cluster(&mx, &MclConfig::default());
        assert_eq!(clustering.members(), vec![vec![0]]);
    }
    #[test]
    fn empty_graph() {
        let mx = SparseMatrix::zero(0, 0);
        let clustering = cluster(&mx, &MclConfig::default());
        assert_eq!(clustering.n_cols(), 0);
        assert_eq!(clustering.n_rows(), 0);
    }
    #[test]
    fn zero_main_loop_is_exhausted() {
        let mut mx = path(3);
        mx.make_stochastic();
        let c = MclConfig::default().main_loop_length(Some(0));
        let (processed, report) = process(mx.clone(), &c);
        assert_eq!(report.state, MclState::Exhausted);
        assert_eq!(report.iterations(), 0);
        assert_eq!(processed, mx);
        let c = MclConfig::default().main_loop_length(Some(1));
        let (_, report) = process(mx, &c);
        assert_eq!(report.state, MclState::Exhausted);
        assert_eq!(report.main_iterations, 1);
        assert_eq!(report.chaos.len(), 1);
    }
    #[test]
    fn initial_phase_runs_first() {
        let mut mx = path(5);
        mx.make_stochastic();
        let c = MclConfig::default().initial_phase(1.5, 2);
        let (processed, report) = process(mx, &c);
        assert_eq!(report.initial_iterations, 2);
        assert_eq!(report.chaos.len(), report.iterations());
        assert!(report.converged);
        for col in processed.columns() {
            assert!((col.sum() - 1f64).abs() < 1e-10);
        }
    }
    #[test]
    fn blocks_are_recovered() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(4820);
        let (mx, block) = gen_blocks(&mut rng, &[12, 8, 5]);
        let clustering = cluster(&mx, &MclConfig::default());
        let assignment = clustering.assignment();
        assert!(assignment.iter().all(|a| a.is_some()));
        for i in 0..block.len() {
            for j in 0..block.len() {
                if block[i] != block[j] {
                    assert_ne!(assignment[i], assignment[j], "{}\t{}", i, j);
                }
            }
        }
    }
    #[test]
    fn threads_do_not_change_clustering() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(913);
        let (mx, _) = gen_blocks(&mut rng, &[20, 15, 10, 10, 3]);
        let c = MclConfig::default();
        let (serial, serial_report) = mx.markov_clustering(&c);
        let c = c.threads(3, 2).clone_barrier(Some(1f64));
        let (threaded, report) = mx.markov_clustering(&c);
        assert_eq!(serial, threaded);
        assert_eq!(serial_report.chaos, report.chaos);
    }
    #[test]
    fn permutation_relabels_clusters() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(31);
        let (mx, _) = gen_blocks(&mut rng, &[9, 7, 4]);
        let mut perm: Vec<usize> = (0..mx.n_cols()).collect();
        perm.shuffle(&mut rng);
        let c = MclConfig::default();
        let mut original: Vec<Vec<usize>> = cluster(&mx, &c)
            .members()
            .into_iter()
            .map(|xs| {
                let mut xs: Vec<_> = xs.into_iter().map(|i| perm[i]).collect();
                xs.sort();
                xs
            })
            .collect();
        original.sort();
        let mut permuted = cluster(&mx.permute(&perm), &c).members();
        permuted.sort();
        assert_eq!(original, permuted);
    }
    #[test]
    #[should_panic]
    fn non_square() {
        cluster(&SparseMatrix::zero(2, 3), &MclConfig::default());
    }
}
