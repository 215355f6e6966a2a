use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pruning {
    Rigid,
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per cluster.
    Lines,
    /// A clustering matrix in the mcl format.
    Matrix,
    /// JSON with the clusters and the run summary.
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "mcl")]
#[command(author = "Bansho Masutani<ban-m@g.ecc.u-tokyo.ac.jp>")]
#[command(version = "0.2")]
#[command(about = "Markov clustering of a weighted graph", long_about = None)]
pub struct McLArgs {
    /// Input graph in the mcl matrix format (or an edge list with --abc). `-` for STDIN.
    pub input: PathBuf,
    /// Read the input as a label edge list `label label [weight]`.
    #[arg(long)]
    pub abc: bool,
    /// Output file. STDOUT if not given.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// TOML profile of the parameters. Options below override it.
    #[arg(long, value_name = "TOML")]
    pub profile: Option<PathBuf>,
    /// Inflation of the main phase.
    #[arg(short = 'I', long)]
    pub inflation: Option<f64>,
    /// Inflation of the initial phase.
    #[arg(long)]
    pub init_inflation: Option<f64>,
    /// Number of iterations in the initial phase.
    #[arg(long)]
    pub init_loop: Option<usize>,
    /// Maximum number of iterations in the main phase.
    #[arg(long)]
    pub main_loop: Option<usize>,
    /// Pruning cut (rigid) or its lower bound (adaptive).
    #[arg(short = 'P', long)]
    pub precision: Option<f64>,
    /// Keep at most this many entries per column.
    #[arg(short = 'S', long)]
    pub select: Option<usize>,
    /// Recover up to this many entries when pruning lost too much mass.
    #[arg(short = 'R', long)]
    pub recover: Option<usize>,
    /// Fraction of mass below which recovery starts.
    #[arg(long)]
    pub pct: Option<f64>,
    #[arg(long, value_enum)]
    pub pruning: Option<Pruning>,
    /// Number of threads in expansion.
    #[arg(short, long)]
    pub threads: Option<usize>,
    /// Number of threads in inflation.
    #[arg(long)]
    pub inflation_threads: Option<usize>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Lines)]
    pub output_format: OutputFormat,
    /// Debug mode. -v: info, -vv: debug, -vvv: trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl McLArgs {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
