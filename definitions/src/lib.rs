//! Definitions -- A tiny data model for Markov clustering.
//! Every crate in this workspace passes graphs and clusterings around as the column-major
//! [SparseMatrix](SparseMatrix), whose columns are [SparseVector](SparseVector)s of index-value pairs.
pub mod matrix;
pub mod vector;
pub use matrix::{Clustering, SparseMatrix};
pub use vector::{Ivp, KthMode, SparseVector};

/// The reason why a matrix is not a well-formed sparse matrix.
/// It is returned by [SparseMatrix::validate](SparseMatrix::validate).
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixError {
    /// The indices of the column are not in ascending order.
    Unsorted { column: usize },
    /// The column has the same index twice.
    DuplicateIndex { column: usize, index: usize },
    /// The value is negative.
    NegativeValue { column: usize, index: usize, value: f64 },
    /// The value is NaN or infinite.
    NonFiniteValue { column: usize, index: usize },
    /// The row index exceeds the number of rows.
    OutOfRange {
        column: usize,
        index: usize,
        n_rows: usize,
    },
}

impl std::fmt::Display for MatrixError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MatrixError::Unsorted { column } => write!(f, "column {column} is not sorted"),
            MatrixError::DuplicateIndex { column, index } => {
                write!(f, "column {column} has index {index} twice")
            }
            MatrixError::NegativeValue {
                column,
                index,
                value,
            } => write!(f, "column {column} has a negative value {value} at {index}"),
            MatrixError::NonFiniteValue { column, index } => {
                write!(f, "column {column} has a non-finite value at {index}")
            }
            MatrixError::OutOfRange {
                column,
                index,
                n_rows,
            } => write!(f, "column {column} has index {index}, but only {n_rows} rows"),
        }
    }
}

impl std::error::Error for MatrixError {}
