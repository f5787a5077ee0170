//! # Moments Model
//!
//! Mean-return vector and covariance matrix derived from a [`ReturnTable`],
//! the input boundary of the optimizer. Derived values are never mutated in
//! place; a changed table means a fresh model.

use ndarray::Array1;
use ndarray::Array2;
use ndarray_stats::CorrelationExt;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::series::ReturnTable;

/// Per-asset mean returns and the sample covariance matrix, in table column
/// order.
#[derive(Clone, Debug)]
pub struct MomentsModel {
  assets: Vec<String>,
  mean: Array1<f64>,
  cov: Array2<f64>,
}

impl MomentsModel {
  /// Derive moments from a return table: arithmetic per-column means and the
  /// sample (n-1 denominator) covariance matrix.
  pub fn from_returns(table: &ReturnTable) -> Result<Self> {
    if table.n_periods() < 2 {
      return Err(PortfolioError::InsufficientData {
        required: 2,
        actual: table.n_periods(),
      });
    }

    let n_assets = table.n_assets();
    let n_periods = table.n_periods();

    // rows are assets, columns are observations
    let mut data = Array2::<f64>::zeros((n_assets, n_periods));
    for (i, (_, returns)) in table.iter().enumerate() {
      for (t, &r) in returns.iter().enumerate() {
        data[[i, t]] = r;
      }
    }

    let mean = data
      .rows()
      .into_iter()
      .map(|row| row.sum() / n_periods as f64)
      .collect();
    let cov = data
      .cov(1.0)
      .map_err(|_| PortfolioError::InvalidInput("covariance is undefined".into()))?;

    Ok(Self {
      assets: table.assets().to_vec(),
      mean,
      cov,
    })
  }

  /// Build a model from externally supplied moments, validating dimensions
  /// and symmetry.
  pub fn from_raw(assets: Vec<String>, mean: Array1<f64>, cov: Array2<f64>) -> Result<Self> {
    let n = assets.len();
    if mean.len() != n {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        actual: mean.len(),
      });
    }
    if cov.nrows() != n || cov.ncols() != n {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        actual: cov.nrows().max(cov.ncols()),
      });
    }

    if mean.iter().any(|m| !m.is_finite()) || cov.iter().any(|c| !c.is_finite()) {
      return Err(PortfolioError::InvalidInput(
        "moments must be finite".into(),
      ));
    }

    for i in 0..n {
      for j in (i + 1)..n {
        if (cov[[i, j]] - cov[[j, i]]).abs() > 1e-10 {
          return Err(PortfolioError::InvalidInput(
            "covariance matrix must be symmetric".into(),
          ));
        }
      }
    }

    Ok(Self { assets, mean, cov })
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn mean(&self) -> &Array1<f64> {
    &self.mean
  }

  pub fn cov(&self) -> &Array2<f64> {
    &self.cov
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  /// Expected portfolio return `w' mu`.
  pub fn portfolio_return(&self, weights: &Array1<f64>) -> Result<f64> {
    self.check_dim(weights)?;
    Ok(weights.dot(&self.mean))
  }

  /// Portfolio volatility `sqrt(w' Sigma w)`.
  pub fn portfolio_vol(&self, weights: &Array1<f64>) -> Result<f64> {
    self.check_dim(weights)?;
    Ok(weights.dot(&self.cov.dot(weights)).max(0.0).sqrt())
  }

  /// Correlation matrix implied by the covariance matrix.
  pub fn correlation(&self) -> Array2<f64> {
    let n = self.n_assets();
    let mut corr = Array2::<f64>::eye(n);
    for i in 0..n {
      for j in 0..n {
        let denom = (self.cov[[i, i]] * self.cov[[j, j]]).sqrt();
        corr[[i, j]] = if denom > 1e-15 {
          self.cov[[i, j]] / denom
        } else if i == j {
          1.0
        } else {
          0.0
        };
      }
    }
    corr
  }

  fn check_dim(&self, weights: &Array1<f64>) -> Result<()> {
    if weights.len() != self.n_assets() {
      return Err(PortfolioError::DimensionMismatch {
        expected: self.n_assets(),
        actual: weights.len(),
      });
    }
    Ok(())
  }
}
