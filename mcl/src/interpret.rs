//! Interpretation -- read the clusters off a converged matrix.
//!
//! Each column keeps only its entries above a per-column bar, which turns the matrix into
//! a directed graph: `j -> i` if the `j`-th column keeps `i`. Nodes keeping their own loop are
//! attractors, and so is every node reached from an attractor. A cluster is grown from an
//! attractor by following both directions from attractive nodes and only the backward direction
//! from the other nodes.
use super::config::{ClosureMode, InterpretConfig};
use definitions::{Clustering, SparseMatrix, SparseVector};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attractivity {
    Attractive,
    Unattractive,
    Undetermined,
}

/// The directed graph of kept entries: `forward` is the characteristic matrix,
/// `backward` its transpose.
#[derive(Debug, Clone)]
pub struct Relation {
    pub forward: SparseMatrix,
    pub backward: SparseMatrix,
}

impl Relation {
    pub fn new(mx: &SparseMatrix, c: &InterpretConfig) -> Self {
        assert!(mx.is_square(), "interpretation of a non-square matrix");
        let cols = mx
            .columns()
            .iter()
            .enumerate()
            .map(|(j, col)| {
                let bar = c.w_center * col.center()
                    + c.w_selfval * col.self_value(j)
                    + c.w_maxval * col.max_value()
                    - c.delta;
                let mut col = col.clone();
                col.select_at_or_above(bar);
                col.make_characteristic();
                col
            })
            .collect();
        let forward = SparseMatrix::from_columns(cols, mx.n_rows());
        let backward = forward.transpose();
        Self { forward, backward }
    }
    pub fn len(&self) -> usize {
        self.forward.n_cols()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Nodes kept by the `j`-th column.
    pub fn children(&self, j: usize) -> &SparseVector {
        self.forward.column(j)
    }
    /// Nodes whose column keeps `j`.
    pub fn parents(&self, j: usize) -> &SparseVector {
        self.backward.column(j)
    }
}

/// Decide the attractivity of every node.
pub fn attractivity(rel: &Relation, closure: ClosureMode) -> Vec<Attractivity> {
    let mut states: Vec<_> = (0..rel.len())
        .map(|j| {
            if rel.children(j).contains(j) {
                Attractivity::Attractive
            } else if rel.parents(j).is_empty() {
                Attractivity::Unattractive
            } else {
                Attractivity::Undetermined
            }
        })
        .collect();
    match closure {
        ClosureMode::Exact => propagate(rel, &mut states),
        ClosureMode::DepthBounded(depth) => {
            let mut gave_up = vec![None; rel.len()];
            for j in 0..rel.len() {
                if states[j] == Attractivity::Undetermined {
                    let mut search = BoundedSearch {
                        rel,
                        max_depth: depth,
                        round: j,
                        states: &mut states,
                        gave_up: &mut gave_up,
                    };
                    search.run(j, 0);
                }
            }
        }
    }
    for state in states.iter_mut() {
        if *state == Attractivity::Undetermined {
            *state = Attractivity::Unattractive;
        }
    }
    states
}

// Everything reachable from an attractor is attractive.
fn propagate(rel: &Relation, states: &mut [Attractivity]) {
    let mut queue: VecDeque<_> = (0..rel.len())
        .filter(|&j| states[j] == Attractivity::Attractive)
        .collect();
    while let Some(node) = queue.pop_front() {
        for child in rel.children(node).indices() {
            if states[child] != Attractivity::Attractive {
                states[child] = Attractivity::Attractive;
                queue.push_back(child);
            }
        }
    }
}

struct BoundedSearch<'a> {
    rel: &'a Relation,
    max_depth: usize,
    round: usize,
    states: &'a mut [Attractivity],
    // gave_up[i] == Some((round, left)): in this round, the search from i
    // already ran out of depth with `left` steps to go.
    gave_up: &'a mut [Option<(usize, usize)>],
}

impl<'a> BoundedSearch<'a> {
    // Some(true) if attractive, Some(false) if surely unattractive, None if the depth ran out.
    fn run(&mut self, node: usize, depth: usize) -> Option<bool> {
        match self.states[node] {
            Attractivity::Attractive => return Some(true),
            Attractivity::Unattractive => return Some(false),
            Attractivity::Undetermined => {}
        }
        if self.max_depth <= depth {
            return None;
        }
        let left = self.max_depth - depth;
        if matches!(self.gave_up[node], Some((round, l)) if round == self.round && left <= l) {
            return None;
        }
        let rel = self.rel;
        let mut exhausted = true;
        for parent in rel.parents(node).indices().filter(|&p| p != node) {
            match self.run(parent, depth + 1) {
                Some(true) => {
                    self.states[node] = Attractivity::Attractive;
                    return Some(true);
                }
                Some(false) => {}
                None => exhausted = false,
            }
        }
        if exhausted {
            self.states[node] = Attractivity::Unattractive;
            Some(false)
        } else {
            self.gave_up[node] = Some((self.round, left));
            None
        }
    }
}

/// Read the clusters off `mx`. Clusters may overlap, and some nodes may be in no cluster.
pub fn interpret(mx: &SparseMatrix, c: &InterpretConfig) -> Clustering {
    let rel = Relation::new(mx, c);
    let states = attractivity(&rel, c.closure);
    let n = rel.len();
    let mut classified = vec![false; n];
    // visited[i] == k + 1 iff i is in the k-th cluster.
    let mut visited = vec![0; n];
    let mut clusters = vec![];
    for seed in 0..n {
        if states[seed] != Attractivity::Attractive || classified[seed] {
            continue;
        }
        let stamp = clusters.len() + 1;
        let mut members = vec![seed];
        visited[seed] = stamp;
        let mut frontier = vec![seed];
        while !frontier.is_empty() {
            let mut next = vec![];
            for &node in frontier.iter() {
                let backward = rel.parents(node).indices();
                let neighbors: Vec<usize> = match states[node] {
                    Attractivity::Attractive => {
                        rel.children(node).indices().chain(backward).collect()
                    }
                    _ => backward.collect(),
                };
                for next_node in neighbors {
                    if visited[next_node] != stamp {
                        visited[next_node] = stamp;
                        members.push(next_node);
                        next.push(next_node);
                    }
                }
            }
            frontier = next;
        }
        for &m in members.iter() {
            classified[m] = true;
        }
        clusters.push(SparseVector::from_pairs(members.into_iter().map(|m| (m, 1f64))));
    }
    let attractors = states
        .iter()
        .filter(|&&s| s == Attractivity::Attractive)
        .count();
    let mut clustering = SparseMatrix::from_columns(clusters, n);
    let leftover: Vec<_> = (0..n).filter(|&i| !classified[i]).collect();
    debug!(
        "INTERPRET\t{}\t{}\t{}\t{}",
        n,
        attractors,
        clustering.n_cols(),
        leftover.len()
    );
    if c.garbage_column && !leftover.is_empty() {
        let garbage = SparseVector::from_pairs(leftover.into_iter().map(|i| (i, 1f64)));
        clustering.push_column(garbage);
    }
    clustering
}

#[cfg(test)]
mod tests {
    use super::*;
    fn converged() -> SparseMatrix {
        // 0,1,2 flow into 1; 3,4 flow into 3 and 4 equally; 5 flows into 3.
        let triplets = vec![
            (0, 1, 1f64),
            (1, 1, 1f64),
            (2, 1, 1f64),
            (3, 3, 0.5),
            (3, 4, 0.5),
            (4, 3, 0.5),
            (4, 4, 0.5),
            (5, 3, 1f64),
        ];
        SparseMatrix::from_triplets(6, 6, triplets)
    }
    #[test]
    fn attractors() {
        let c = InterpretConfig::default();
        let rel = Relation::new(&converged(), &c);
        let states = attractivity(&rel, ClosureMode::Exact);
        use Attractivity::*;
        let answer = vec![
            Unattractive,
            Attractive,
            Unattractive,
            Attractive,
            Attractive,
            Unattractive,
        ];
        assert_eq!(states, answer);
        let states = attractivity(&rel, ClosureMode::DepthBounded(20));
        assert_eq!(states, answer);
    }
    #[test]
    fn clusters_of_converged() {
        let clustering = interpret(&converged(), &InterpretConfig::default());
        assert_eq!(clustering.n_rows(), 6);
        assert_eq!(clustering.members(), vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }
    #[test]
    fn overlap_is_possible() {
        // 2 splits between the attractors 0 and 1.
        let triplets = vec![(0, 0, 1f64), (1, 1, 1f64), (2, 0, 0.5), (2, 1, 0.5)];
        let mx = SparseMatrix::from_triplets(3, 3, triplets);
        let clustering = interpret(&mx, &InterpretConfig::default());
        assert_eq!(clustering.members(), vec![vec![0, 2], vec![1, 2]]);
    }
    // Only n-1 has a loop; n-1 -> n-2 -> ... -> 0 -> 1.
    fn chain(n: usize) -> SparseMatrix {
        let mut triplets = vec![(n - 1, n - 1, 0.5), (n - 1, n - 2, 0.5)];
        triplets.extend((1..n - 1).map(|j| (j, j - 1, 1f64)));
        triplets.push((0, 1, 1f64));
        SparseMatrix::from_triplets(n, n, triplets)
    }
    #[test]
    fn depth_bound_truncates_long_chains() {
        let c = InterpretConfig::default();
        let rel = Relation::new(&chain(40), &c);
        let exact = attractivity(&rel, ClosureMode::Exact);
        assert!(exact.iter().all(|&s| s == Attractivity::Attractive));
        let bounded = attractivity(&rel, ClosureMode::DepthBounded(20));
        assert_eq!(bounded[39], Attractivity::Attractive);
        assert_eq!(bounded[19], Attractivity::Attractive);
        assert_eq!(bounded[18], Attractivity::Unattractive);
        assert_eq!(bounded[0], Attractivity::Unattractive);
    }
    #[test]
    fn complete_digraph_without_loops() {
        let n = 6;
        let triplets = (0..n)
            .flat_map(|j| (0..n).filter(move |&i| i != j).map(move |i| (j, i, 0.2)));
        let mx = SparseMatrix::from_triplets(n, n, triplets);
        let c = InterpretConfig::default().closure(ClosureMode::DepthBounded(20));
        let rel = Relation::new(&mx, &c);
        let states = attractivity(&rel, c.closure);
        assert!(states.iter().all(|&s| s == Attractivity::Unattractive));
        assert_eq!(interpret(&mx, &c).n_cols(), 0);
    }
    #[test]
    fn cycles_terminate() {
        // 0 -> 1 -> 2 -> 0, no loops: nothing is attractive.
        let triplets = vec![(0, 1, 1f64), (1, 2, 1f64), (2, 0, 1f64)];
        let mx = SparseMatrix::from_triplets(3, 3, triplets);
        let c = InterpretConfig::default();
        let rel = Relation::new(&mx, &c);
        for mode in [ClosureMode::Exact, ClosureMode::DepthBounded(20)] {
            let states = attractivity(&rel, mode);
            assert!(states.iter().all(|&s| s == Attractivity::Unattractive));
        }
        assert_eq!(interpret(&mx, &c).n_cols(), 0);
        let c = c.garbage_column(true);
        assert_eq!(interpret(&mx, &c).members(), vec![vec![0, 1, 2]]);
    }
}
