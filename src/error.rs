//! # Errors
//!
//! Crate-wide error kinds. Every failure is raised synchronously at the point
//! of detection; the library never returns a partially computed or NaN-laden
//! result in place of an error.

use thiserror::Error;

/// Error kinds shared across the statistics, optimization and simulation
/// layers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
  /// Empty or otherwise malformed input data.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Misaligned dimensions between asset columns, schedules or weights.
  #[error("dimension mismatch: expected {expected}, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },

  /// A confidence level or significance level outside its valid range.
  #[error("invalid level: {0}")]
  InvalidLevel(f64),

  /// An out-of-range configuration parameter.
  #[error("invalid parameter {name}: {value}")]
  InvalidParameter { name: &'static str, value: f64 },

  /// The optimization problem has no feasible point under the given bounds
  /// and equality constraints, or the solver failed to converge to one.
  #[error("infeasible constraints: {0}")]
  InfeasibleConstraints(String),

  /// A statistical procedure was given fewer observations than it requires.
  #[error("insufficient data: need at least {required} observations, got {actual}")]
  InsufficientData { required: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, PortfolioError>;
