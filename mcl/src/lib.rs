//! Markov clustering on sparse column stochastic matrices.
//!
//! ```text
//! let clustering = graph.markov_clustering(&MclConfig::new(2.0)).0;
//! ```
#[macro_use]
extern crate log;
pub mod compose;
pub mod config;
pub mod enstrict;
pub mod expand;
pub mod inflate;
pub mod interpret;
pub mod process;
pub mod prune;
pub mod workers;

pub use config::{
    ClosureMode, ComposeMode, EnstrictFlags, InterpretConfig, MclConfig, PruneConfig, PruningMode,
};
pub use enstrict::{enstrict, EnstrictCounts};
pub use expand::expand_once;
pub use interpret::interpret;
pub use process::{cluster, process, MarkovClustering, MclReport, MclState};
