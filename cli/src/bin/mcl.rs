use clap::Parser;
use definitions::SparseMatrix;
use mcl::MarkovClustering;
use mcl_cli::io::{read_abc, read_matrix, write_json, write_lines, write_matrix, ClusteringDump};
use mcl_cli::mcl_commands::{McLArgs, OutputFormat};
use std::io::{BufReader, BufWriter, Read, Write};
#[macro_use]
extern crate log;

fn open_input(args: &McLArgs) -> std::io::Result<Box<dyn Read>> {
    if args.input.as_os_str() == "-" {
        Ok(Box::new(std::io::stdin()))
    } else {
        debug!("Opening {}", args.input.display());
        Ok(Box::new(std::fs::File::open(&args.input)?))
    }
}

fn open_output(args: &McLArgs) -> std::io::Result<Box<dyn Write>> {
    match args.output.as_ref() {
        Some(path) => Ok(Box::new(std::fs::File::create(path)?)),
        None => Ok(Box::new(std::io::stdout())),
    }
}

fn read_graph(args: &McLArgs) -> std::io::Result<(SparseMatrix, Option<Vec<String>>)> {
    let rdr = BufReader::new(open_input(args)?);
    if args.abc {
        let (mx, labels) = read_abc(rdr)?;
        Ok((mx, Some(labels)))
    } else {
        let mx = read_matrix(rdr)?;
        if !mx.is_square() {
            let msg = format!("The graph should be square:{}x{}", mx.n_rows(), mx.n_cols());
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, msg));
        }
        Ok((mx, None))
    }
}

fn main() -> std::io::Result<()> {
    let args = McLArgs::parse();
    let level = args.log_level();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let config = mcl_cli::profile::config_of(&args)?;
    debug!("START\tMCL\t{:?}", config);
    let (graph, labels) = read_graph(&args)?;
    info!("GRAPH\t{}\t{}", graph.n_cols(), graph.nnz());
    let (clustering, report) = graph.markov_clustering(&config);
    info!(
        "RESULT\t{}\t{}\t{}\t{}",
        clustering.n_cols(),
        report.iterations(),
        report.converged,
        report.emergency
    );
    if !report.converged {
        warn!("Not converged in {} iterations", report.iterations());
    }
    let mut wtr = BufWriter::new(open_output(&args)?);
    let labels = labels.as_deref();
    match args.output_format {
        OutputFormat::Lines => write_lines(&clustering, labels, &mut wtr)?,
        OutputFormat::Matrix => write_matrix(&clustering, &mut wtr)?,
        OutputFormat::Json => {
            let dump =
                ClusteringDump::new(&clustering, labels, report.converged, report.iterations());
            write_json(&dump, &mut wtr)?
        }
    }
    wtr.flush()
}
