//! Readers and writers -- the mcl matrix format, label edge lists, and clusterings.
//!
//! The matrix format is
//! ```text
//! (mclheader
//! mcltype matrix
//! dimensions 3x3
//! )
//! (mclmatrix
//! begin
//! 0 0:0.5 1:0.5 $
//! 1 1 2 $
//! )
//! ```
//! where the dimensions are `rows x columns`, each column starts with its index and ends with `$`,
//! and a missing `:value` means one. Columns not listed are empty.
use definitions::{Clustering, SparseMatrix, SparseVector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Read, Write};

fn invalid<T: std::fmt::Display>(msg: T) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())
}

fn parse_dimensions(token: &str) -> std::io::Result<(usize, usize)> {
    let (rows, cols) = token
        .split_once('x')
        .ok_or_else(|| invalid(format!("Malformed dimensions:{token}")))?;
    let rows = rows.parse().map_err(|_| invalid(format!("Malformed rows:{rows}")))?;
    let cols = cols.parse().map_err(|_| invalid(format!("Malformed columns:{cols}")))?;
    Ok((rows, cols))
}

fn parse_entry(token: &str) -> std::io::Result<(usize, f64)> {
    let (idx, val) = match token.split_once(':') {
        Some((idx, val)) => (idx, Some(val)),
        None => (token, None),
    };
    let idx = idx
        .parse()
        .map_err(|_| invalid(format!("Malformed index:{token}")))?;
    let val = match val {
        Some(val) => val
            .parse()
            .map_err(|_| invalid(format!("Malformed value:{token}")))?,
        None => 1f64,
    };
    Ok((idx, val))
}

/// Parse a matrix in the mcl format. Duplicated entries in a column are summed.
pub fn parse_matrix(text: &str) -> std::io::Result<SparseMatrix> {
    let mut tokens = text.split_whitespace();
    if tokens.next() != Some("(mclheader") {
        return Err(invalid("The input does not start with (mclheader"));
    }
    let mut dimensions = None;
    while let Some(token) = tokens.next() {
        match token {
            ")" => break,
            "dimensions" => {
                let dims = tokens.next().ok_or_else(|| invalid("No dimensions"))?;
                dimensions = Some(parse_dimensions(dims)?);
            }
            _ => {}
        }
    }
    let (n_rows, n_cols) = dimensions.ok_or_else(|| invalid("No dimensions in the header"))?;
    if tokens.next() != Some("(mclmatrix") || tokens.next() != Some("begin") {
        return Err(invalid("No (mclmatrix begin after the header"));
    }
    let mut parsed: BTreeMap<usize, Vec<(usize, f64)>> = BTreeMap::new();
    let mut closed = false;
    while let Some(token) = tokens.next() {
        if token == ")" {
            closed = true;
            break;
        }
        let col: usize = token
            .parse()
            .map_err(|_| invalid(format!("Malformed column index:{token}")))?;
        if n_cols <= col {
            return Err(invalid(format!("Column {col} out of {n_cols} columns")));
        }
        let pairs = parsed.entry(col).or_default();
        loop {
            match tokens.next() {
                Some("$") => break,
                Some(token) => pairs.push(parse_entry(token)?),
                None => return Err(invalid(format!("Column {col} is not terminated by $"))),
            }
        }
    }
    if !closed {
        return Err(invalid("The matrix is not closed by )"));
    }
    let mut cols: Vec<SparseVector> = vec![];
    cols.try_reserve_exact(n_cols)
        .map_err(|why| invalid(format!("Too many columns:{n_cols}:{why}")))?;
    let mut parsed = parsed.into_iter().peekable();
    for j in 0..n_cols {
        match parsed.next_if(|(col, _)| *col == j) {
            Some((_, pairs)) => cols.push(SparseVector::from_pairs(pairs)),
            None => cols.push(SparseVector::new()),
        }
    }
    let mx = SparseMatrix::from_columns(cols, n_rows);
    mx.validate().map_err(invalid)?;
    Ok(mx)
}

pub fn read_matrix<R: Read>(mut rdr: R) -> std::io::Result<SparseMatrix> {
    let mut text = String::new();
    rdr.read_to_string(&mut text)?;
    parse_matrix(&text)
}

/// Write `mx` in the mcl format. Empty columns are omitted.
pub fn write_matrix<W: Write>(mx: &SparseMatrix, wtr: &mut W) -> std::io::Result<()> {
    writeln!(wtr, "(mclheader")?;
    writeln!(wtr, "mcltype matrix")?;
    writeln!(wtr, "dimensions {}x{}", mx.n_rows(), mx.n_cols())?;
    writeln!(wtr, ")")?;
    writeln!(wtr, "(mclmatrix")?;
    writeln!(wtr, "begin")?;
    for (j, col) in mx.columns().iter().enumerate() {
        if col.is_empty() {
            continue;
        }
        write!(wtr, "{j}")?;
        for ivp in col.iter() {
            write!(wtr, " {}:{}", ivp.idx, ivp.val)?;
        }
        writeln!(wtr, " $")?;
    }
    writeln!(wtr, ")")
}

/// Read a label edge list: `label label [weight]` per line, weight one if omitted.
/// The graph is undirected; if an edge appears more than once, the largest weight is kept.
/// Return the matrix and the labels, the `i`-th label naming the `i`-th node.
pub fn read_abc<R: BufRead>(rdr: R) -> std::io::Result<(SparseMatrix, Vec<String>)> {
    let mut labels: Vec<String> = vec![];
    let mut ids: HashMap<String, usize> = HashMap::new();
    let mut edges: HashMap<(usize, usize), f64> = HashMap::new();
    for (lineno, line) in rdr.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<_> = line.split_whitespace().collect();
        let weight = match fields.as_slice() {
            [_, _] => 1f64,
            [_, _, w] => w
                .parse()
                .map_err(|_| invalid(format!("Malformed weight at line {}:{w}", lineno + 1)))?,
            _ => return Err(invalid(format!("Malformed line {}:{line}", lineno + 1))),
        };
        if !weight.is_finite() || weight < 0f64 {
            return Err(invalid(format!("Invalid weight at line {}:{weight}", lineno + 1)));
        }
        let mut id_of = |label: &str| {
            *ids.entry(label.to_string()).or_insert_with(|| {
                labels.push(label.to_string());
                labels.len() - 1
            })
        };
        let (from, to) = (id_of(fields[0]), id_of(fields[1]));
        for key in [(from, to), (to, from)] {
            let slot = edges.entry(key).or_insert(weight);
            *slot = slot.max(weight);
        }
    }
    let n = labels.len();
    let triplets = edges.into_iter().map(|((from, to), w)| (from, to, w));
    let mx = SparseMatrix::from_triplets(n, n, triplets);
    debug!("ABC\t{}\t{}", n, mx.nnz());
    Ok((mx, labels))
}

fn member_names(cluster: &SparseVector, labels: Option<&[String]>) -> Vec<String> {
    match labels {
        Some(labels) => cluster.indices().map(|i| labels[i].clone()).collect(),
        None => cluster.indices().map(|i| format!("{i}")).collect(),
    }
}

/// One line per cluster, the members separated by tabs.
pub fn write_lines<W: Write>(
    cl: &Clustering,
    labels: Option<&[String]>,
    wtr: &mut W,
) -> std::io::Result<()> {
    for cluster in cl.columns() {
        writeln!(wtr, "{}", member_names(cluster, labels).join("\t"))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringDump {
    pub nodes: usize,
    pub converged: bool,
    pub iterations: usize,
    pub clusters: Vec<Vec<String>>,
}

impl ClusteringDump {
    pub fn new(
        cl: &Clustering,
        labels: Option<&[String]>,
        converged: bool,
        iterations: usize,
    ) -> Self {
        let clusters = cl.columns().iter().map(|c| member_names(c, labels)).collect();
        Self {
            nodes: cl.n_rows(),
            converged,
            iterations,
            clusters,
        }
    }
}

pub fn write_json<W: Write>(dump: &ClusteringDump, wtr: &mut W) -> std::io::Result<()> {
    serde_json::ser::to_writer(&mut *wtr, dump)?;
    writeln!(wtr)
}
