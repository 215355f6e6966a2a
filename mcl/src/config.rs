//! Parameters of the Markov clustering.
//!
//! All the knobs are collected into [MclConfig](MclConfig), constructed once and passed by reference
//! into the expansion, pruning, inflation, and interpretation steps.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruningMode {
    /// Cut at the fixed `precision`.
    Rigid,
    /// Cut at a per-column value computed from the center and the maximum of the column.
    Adaptive,
}

/// How to accumulate the product of a matrix and a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeMode {
    /// Accumulate into a full-width array. Good for dense results.
    Dense,
    /// Accumulate only into the touched rows. Good for sparse results.
    Sparse,
    /// Choose per column from the expected number of touched rows.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    pub mode: PruningMode,
    /// The cut in the rigid mode, and the lower bound of the cut in the adaptive mode.
    /// If None, the rigid mode keeps everything.
    pub precision: Option<f64>,
    /// Keep at most (about) this many entries per column.
    pub select_number: Option<usize>,
    /// If fewer entries than this survive and too much mass was lost,
    /// restore the column and keep this many entries.
    pub recover_number: Option<usize>,
    /// The fraction of mass below which recovery is attempted.
    pub recover_mass_pct: f64,
    pub adaptive_cutoff_factor: f64,
    pub adaptive_cutoff_exponent: f64,
    pub compose: ComposeMode,
    /// The number of the worst columns to remember in the diagnostics.
    pub worst_n: usize,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            mode: PruningMode::Rigid,
            precision: Some(1e-4),
            select_number: Some(1100),
            recover_number: Some(1400),
            recover_mass_pct: 0.9,
            adaptive_cutoff_factor: 4f64,
            adaptive_cutoff_exponent: 1f64,
            compose: ComposeMode::Auto,
            worst_n: 10,
        }
    }
}

impl PruneConfig {
    pub fn new(
        mode: PruningMode,
        precision: Option<f64>,
        select_number: Option<usize>,
        recover_number: Option<usize>,
        recover_mass_pct: f64,
    ) -> Self {
        Self {
            mode,
            precision,
            select_number,
            recover_number,
            recover_mass_pct,
            ..Default::default()
        }
    }
    /// Prune nothing: no precision, no selection, no recovery.
    pub fn exact() -> Self {
        Self {
            precision: None,
            select_number: None,
            recover_number: None,
            ..Default::default()
        }
    }
    pub fn adaptive(mut self, factor: f64, exponent: f64) -> Self {
        assert!(0f64 < factor, "adaptive cutoff factor should be positive");
        self.mode = PruningMode::Adaptive;
        self.adaptive_cutoff_factor = factor;
        self.adaptive_cutoff_exponent = exponent;
        self
    }
    pub fn compose(mut self, mode: ComposeMode) -> Self {
        self.compose = mode;
        self
    }
}

/// How to decide the attractivity of the nodes without a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureMode {
    /// Propagate attractivity along the edges until nothing changes. Correct on any cycle.
    Exact,
    /// Recursive search over the parents, giving up at the given depth.
    /// Chains longer than the depth are classified as unattractive.
    DepthBounded(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretConfig {
    pub w_center: f64,
    pub w_selfval: f64,
    pub w_maxval: f64,
    /// Subtracted from the bar so that the maximum of a column always survives.
    pub delta: f64,
    pub closure: ClosureMode,
    /// Put the nodes reached from no attractor into one extra cluster.
    pub garbage_column: bool,
}

impl Default for InterpretConfig {
    fn default() -> Self {
        Self {
            w_center: 0f64,
            w_selfval: 0.999,
            w_maxval: 0.001,
            delta: 1e-6,
            closure: ClosureMode::Exact,
            garbage_column: false,
        }
    }
}

impl InterpretConfig {
    pub fn new(w_center: f64, w_selfval: f64, w_maxval: f64, delta: f64) -> Self {
        Self {
            w_center,
            w_selfval,
            w_maxval,
            delta,
            ..Default::default()
        }
    }
    pub fn closure(mut self, closure: ClosureMode) -> Self {
        self.closure = closure;
        self
    }
    pub fn garbage_column(mut self, garbage_column: bool) -> Self {
        self.garbage_column = garbage_column;
        self
    }
}

/// Which defects of a clustering should be repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnstrictFlags {
    /// Keep only the first occurrence of a node.
    pub repair_overlap: bool,
    /// Put the nodes in no cluster into a new cluster.
    pub repair_missing: bool,
    /// Remove empty clusters.
    pub repair_empty: bool,
}

impl Default for EnstrictFlags {
    fn default() -> Self {
        Self::repair_all()
    }
}

impl EnstrictFlags {
    pub fn repair_all() -> Self {
        Self {
            repair_overlap: true,
            repair_missing: true,
            repair_empty: true,
        }
    }
    pub fn report_only() -> Self {
        Self {
            repair_overlap: false,
            repair_missing: false,
            repair_empty: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MclConfig {
    pub main_inflation: f64,
    /// The maximum number of the main iterations. None means no limit.
    pub main_loop_length: Option<usize>,
    pub init_inflation: f64,
    pub init_loop_length: usize,
    /// Stop when the inhomogeneity of every column goes below this value.
    pub inhomogeneity_stop: f64,
    /// Number of threads in expansion. 0 or 1 means the current thread.
    pub expansion_threads: usize,
    /// Number of threads in inflation. 0 or 1 means the current thread.
    pub inflation_threads: usize,
    /// Each expansion thread works on its own copy of the matrix when the
    /// average number of entries per column exceeds this value.
    pub clone_barrier: Option<f64>,
    /// Reset the loops to the maximum weight of each column before iterating.
    pub adjust_loops: bool,
    pub prune: PruneConfig,
    pub interpret: InterpretConfig,
    pub enstrict: EnstrictFlags,
}

impl Default for MclConfig {
    fn default() -> Self {
        Self {
            main_inflation: 2f64,
            main_loop_length: None,
            init_inflation: 2f64,
            init_loop_length: 0,
            inhomogeneity_stop: 1e-4,
            expansion_threads: 1,
            inflation_threads: 1,
            clone_barrier: None,
            adjust_loops: true,
            prune: PruneConfig::default(),
            interpret: InterpretConfig::default(),
            enstrict: EnstrictFlags::default(),
        }
    }
}

impl MclConfig {
    pub fn new(main_inflation: f64) -> Self {
        assert!(0f64 < main_inflation, "inflation should be positive");
        Self {
            main_inflation,
            ..Default::default()
        }
    }
    pub fn initial_phase(mut self, init_inflation: f64, init_loop_length: usize) -> Self {
        assert!(0f64 < init_inflation, "inflation should be positive");
        self.init_inflation = init_inflation;
        self.init_loop_length = init_loop_length;
        self
    }
    pub fn main_loop_length(mut self, length: Option<usize>) -> Self {
        self.main_loop_length = length;
        self
    }
    pub fn threads(mut self, expansion: usize, inflation: usize) -> Self {
        self.expansion_threads = expansion;
        self.inflation_threads = inflation;
        self
    }
    pub fn clone_barrier(mut self, barrier: Option<f64>) -> Self {
        self.clone_barrier = barrier;
        self
    }
    pub fn adjust_loops(mut self, adjust: bool) -> Self {
        self.adjust_loops = adjust;
        self
    }
    pub fn prune(mut self, prune: PruneConfig) -> Self {
        self.prune = prune;
        self
    }
    pub fn interpret(mut self, interpret: InterpretConfig) -> Self {
        self.interpret = interpret;
        self
    }
    pub fn enstrict(mut self, flags: EnstrictFlags) -> Self {
        self.enstrict = flags;
        self
    }
}
