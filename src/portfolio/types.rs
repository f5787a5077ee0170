//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\min_{\mathbf{w}} \sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}
//! $$
//!
//! Shared containers for the optimization layer: per-asset weight bounds,
//! frontier points and solver configuration.

use ndarray::Array1;

use crate::error::PortfolioError;
use crate::error::Result;

/// Per-asset weight bounds `[lower, upper]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
  lower: Array1<f64>,
  upper: Array1<f64>,
}

impl Bounds {
  /// The long-only box `[0, 1]` for every asset.
  pub fn long_only(n: usize) -> Self {
    Self {
      lower: Array1::zeros(n),
      upper: Array1::ones(n),
    }
  }

  /// The same `[lo, hi]` interval for every asset.
  pub fn uniform(n: usize, lo: f64, hi: f64) -> Result<Self> {
    Self::per_asset(&vec![(lo, hi); n])
  }

  /// Explicit `(lo, hi)` pairs, one per asset.
  pub fn per_asset(pairs: &[(f64, f64)]) -> Result<Self> {
    for &(lo, hi) in pairs {
      if !lo.is_finite() || !hi.is_finite() {
        return Err(PortfolioError::InvalidParameter {
          name: "bounds",
          value: if lo.is_finite() { hi } else { lo },
        });
      }
      if lo > hi {
        return Err(PortfolioError::InvalidParameter {
          name: "bounds",
          value: lo,
        });
      }
    }

    Ok(Self {
      lower: pairs.iter().map(|&(lo, _)| lo).collect(),
      upper: pairs.iter().map(|&(_, hi)| hi).collect(),
    })
  }

  pub fn len(&self) -> usize {
    self.lower.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lower.is_empty()
  }

  pub fn lower(&self) -> &Array1<f64> {
    &self.lower
  }

  pub fn upper(&self) -> &Array1<f64> {
    &self.upper
  }

  /// Project a raw point into the box, component-wise.
  pub fn clamp(&self, x: &[f64]) -> Array1<f64> {
    x.iter()
      .zip(self.lower.iter().zip(self.upper.iter()))
      .map(|(&xi, (&lo, &hi))| xi.clamp(lo, hi))
      .collect()
  }

  /// Whether every entry of `w` lies within the box, up to `tol`.
  pub fn contains(&self, w: &Array1<f64>, tol: f64) -> bool {
    w.iter()
      .zip(self.lower.iter().zip(self.upper.iter()))
      .all(|(&wi, (&lo, &hi))| wi >= lo - tol && wi <= hi + tol)
  }
}

/// One point on the efficient frontier.
#[derive(Clone, Debug)]
pub struct FrontierPoint {
  /// The return the weights were solved for.
  pub target_return: f64,
  /// Realized portfolio volatility at those weights.
  pub volatility: f64,
  /// Budget-constrained weights, in moments order.
  pub weights: Array1<f64>,
}

/// Configuration of the constrained Nelder-Mead minimizer.
#[derive(Clone, Debug)]
pub struct SolverOptions {
  /// Iteration cap for the simplex search.
  pub max_iters: u64,
  /// Simplex standard-deviation tolerance used as the convergence criterion.
  pub sd_tolerance: f64,
  /// Quadratic penalty weight applied to constraint residuals.
  pub penalty: f64,
  /// Maximum residual a returned point may leave on any constraint.
  pub feasibility_tol: f64,
}

impl Default for SolverOptions {
  fn default() -> Self {
    Self {
      max_iters: 5000,
      sd_tolerance: 1e-10,
      penalty: 1e4,
      feasibility_tol: 1e-4,
    }
  }
}
