//! # Portfolio Optimizer
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}}
//!   \frac{\mathbf{w}^\top\boldsymbol{\mu}-r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! GMV, target-return and maximum-Sharpe portfolios plus the sampled
//! efficient frontier, all solved through the shared constrained minimizer.

use ndarray::Array1;
use ndarray::Array2;
use ndarray_stats::QuantileExt;
use tracing::warn;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::portfolio::moments::MomentsModel;
use crate::portfolio::solver::LinearConstraint;
use crate::portfolio::solver::minimize;
use crate::portfolio::types::Bounds;
use crate::portfolio::types::FrontierPoint;
use crate::portfolio::types::SolverOptions;

fn check_bounds_dim(moments: &MomentsModel, bounds: &Bounds) -> Result<()> {
  if bounds.len() != moments.n_assets() {
    return Err(PortfolioError::DimensionMismatch {
      expected: moments.n_assets(),
      actual: bounds.len(),
    });
  }
  Ok(())
}

fn vol_objective(moments: &MomentsModel) -> impl Fn(&Array1<f64>) -> f64 {
  let cov = moments.cov().clone();
  move |w: &Array1<f64>| w.dot(&cov.dot(w)).max(0.0).sqrt()
}

/// Global Minimum Volatility weights: minimum `sqrt(w' Sigma w)` under the
/// budget constraint and the weight box.
pub fn gmv(moments: &MomentsModel, bounds: &Bounds, opts: &SolverOptions) -> Result<Array1<f64>> {
  check_bounds_dim(moments, bounds)?;
  minimize(
    vol_objective(moments),
    bounds,
    &[LinearConstraint::budget(moments.n_assets())],
    opts,
  )
}

/// Range of portfolio returns reachable under the budget constraint and the
/// box, computed by greedily saturating bounds in mean order.
fn achievable_return_range(mean: &Array1<f64>, bounds: &Bounds) -> Result<(f64, f64)> {
  let lo_sum = bounds.lower().sum();
  let hi_sum = bounds.upper().sum();
  if lo_sum > 1.0 + 1e-12 || hi_sum < 1.0 - 1e-12 {
    return Err(PortfolioError::InfeasibleConstraints(format!(
      "budget constraint unreachable: bounds admit total weight in [{lo_sum}, {hi_sum}]"
    )));
  }

  let n = mean.len();
  let mut order: Vec<usize> = (0..n).collect();
  order.sort_by(|&i, &j| mean[i].total_cmp(&mean[j]));

  let fill = |order: &[usize]| -> f64 {
    let mut budget = 1.0 - lo_sum;
    let mut ret = mean.dot(bounds.lower());
    for &i in order {
      let room = (bounds.upper()[i] - bounds.lower()[i]).min(budget);
      ret += mean[i] * room;
      budget -= room;
      if budget <= 0.0 {
        break;
      }
    }
    ret
  };

  let min_ret = fill(&order);
  order.reverse();
  let max_ret = fill(&order);

  Ok((min_ret, max_ret))
}

/// Minimum-volatility weights achieving a given expected return.
pub fn weights_for_target_return(
  moments: &MomentsModel,
  target_return: f64,
  bounds: &Bounds,
  opts: &SolverOptions,
) -> Result<Array1<f64>> {
  check_bounds_dim(moments, bounds)?;

  let (min_ret, max_ret) = achievable_return_range(moments.mean(), bounds)?;
  if target_return < min_ret - opts.feasibility_tol
    || target_return > max_ret + opts.feasibility_tol
  {
    return Err(PortfolioError::InfeasibleConstraints(format!(
      "target return {target_return} outside achievable range [{min_ret}, {max_ret}]"
    )));
  }

  minimize(
    vol_objective(moments),
    bounds,
    &[
      LinearConstraint::budget(moments.n_assets()),
      LinearConstraint::target_return(moments.mean(), target_return),
    ],
    opts,
  )
}

/// Maximum-Sharpe-ratio weights over the same feasible region.
pub fn max_sharpe(
  moments: &MomentsModel,
  riskfree_rate: f64,
  bounds: &Bounds,
  opts: &SolverOptions,
) -> Result<Array1<f64>> {
  check_bounds_dim(moments, bounds)?;

  let mean = moments.mean().clone();
  let cov = moments.cov().clone();
  let objective = move |w: &Array1<f64>| {
    let vol = w.dot(&cov.dot(w)).max(0.0).sqrt();
    if vol <= 1e-12 {
      return 1e10;
    }
    -(w.dot(&mean) - riskfree_rate) / vol
  };

  minimize(
    objective,
    bounds,
    &[LinearConstraint::budget(moments.n_assets())],
    opts,
  )
}

fn mat_inverse(mat: &Array2<f64>) -> Option<Array2<f64>> {
  let n = mat.nrows();
  let mut aug = Array2::<f64>::zeros((n, 2 * n));
  for i in 0..n {
    for j in 0..n {
      aug[[i, j]] = mat[[i, j]];
    }
    aug[[i, n + i]] = 1.0;
  }

  for col in 0..n {
    let mut max_row = col;
    let mut max_val = aug[[col, col]].abs();
    for row in (col + 1)..n {
      if aug[[row, col]].abs() > max_val {
        max_val = aug[[row, col]].abs();
        max_row = row;
      }
    }

    if max_val < 1e-15 {
      return None;
    }

    if max_row != col {
      for j in 0..(2 * n) {
        let tmp = aug[[col, j]];
        aug[[col, j]] = aug[[max_row, j]];
        aug[[max_row, j]] = tmp;
      }
    }

    let pivot = aug[[col, col]];
    for j in 0..(2 * n) {
      aug[[col, j]] /= pivot;
    }

    for row in 0..n {
      if row == col {
        continue;
      }
      let factor = aug[[row, col]];
      for j in 0..(2 * n) {
        aug[[row, j]] -= factor * aug[[col, j]];
      }
    }
  }

  Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Analytic tangency portfolio `w ∝ Sigma^-1 (mu - rf)` with only the budget
/// constraint active.
///
/// This is the closed form the numerical `max_sharpe` must reduce to when
/// the box is inactive; it is exposed as a correctness anchor, not as the
/// default code path.
pub fn tangency_unconstrained(moments: &MomentsModel, riskfree_rate: f64) -> Result<Array1<f64>> {
  let inv = mat_inverse(moments.cov()).ok_or_else(|| {
    PortfolioError::InfeasibleConstraints("singular covariance matrix".into())
  })?;

  let excess = moments.mean() - riskfree_rate;
  let raw = inv.dot(&excess);
  let sum = raw.sum();
  if sum.abs() < 1e-12 {
    return Err(PortfolioError::InfeasibleConstraints(
      "tangency weights do not admit a budget normalization".into(),
    ));
  }

  Ok(raw / sum)
}

/// Sample the efficient frontier between the GMV return and the maximum
/// single-asset mean.
///
/// Infeasible targets are skipped with a warning, so the returned frontier
/// may hold fewer than `n_points` entries; points are in increasing
/// target-return order.
pub fn efficient_frontier(
  moments: &MomentsModel,
  n_points: usize,
  bounds: &Bounds,
  opts: &SolverOptions,
) -> Result<Vec<FrontierPoint>> {
  if n_points < 2 {
    return Err(PortfolioError::InvalidParameter {
      name: "n_points",
      value: n_points as f64,
    });
  }
  check_bounds_dim(moments, bounds)?;

  let w_gmv = gmv(moments, bounds, opts)?;
  let gmv_return = moments.portfolio_return(&w_gmv)?;
  let max_mean = *moments
    .mean()
    .max()
    .map_err(|_| PortfolioError::InvalidInput("mean vector has no maximum".into()))?;

  if max_mean <= gmv_return {
    let volatility = moments.portfolio_vol(&w_gmv)?;
    return Ok(vec![FrontierPoint {
      target_return: gmv_return,
      volatility,
      weights: w_gmv,
    }]);
  }

  let targets = Array1::linspace(gmv_return, max_mean, n_points);
  let mut frontier = Vec::with_capacity(n_points);
  for &target in &targets {
    match weights_for_target_return(moments, target, bounds, opts) {
      Ok(weights) => {
        let volatility = moments.portfolio_vol(&weights)?;
        frontier.push(FrontierPoint {
          target_return: target,
          volatility,
          weights,
        });
      }
      Err(PortfolioError::InfeasibleConstraints(reason)) => {
        warn!(target_return = target, %reason, "skipping infeasible frontier target");
      }
      Err(e) => return Err(e),
    }
  }

  Ok(frontier)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;

  fn two_asset_moments() -> MomentsModel {
    MomentsModel::from_raw(
      vec!["a".into(), "b".into()],
      array![0.01, 0.02],
      array![[0.0004, 0.0], [0.0, 0.0009]],
    )
    .unwrap()
  }

  #[test]
  fn gmv_splits_uncorrelated_assets_by_inverse_variance() {
    let moments = two_asset_moments();
    let w = gmv(&moments, &Bounds::long_only(2), &SolverOptions::default()).unwrap();

    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(w[0], 9.0 / 13.0, epsilon = 1e-2);

    // diversified vol is below either single asset's vol
    let vol = moments.portfolio_vol(&w).unwrap();
    assert!(vol < 0.0004_f64.sqrt());
    assert!(vol < 0.0009_f64.sqrt());
  }

  #[test]
  fn target_at_gmv_return_reproduces_gmv_weights() {
    let moments = two_asset_moments();
    let bounds = Bounds::long_only(2);
    let opts = SolverOptions::default();

    let w_gmv = gmv(&moments, &bounds, &opts).unwrap();
    let gmv_return = moments.portfolio_return(&w_gmv).unwrap();
    let w = weights_for_target_return(&moments, gmv_return, &bounds, &opts).unwrap();

    for i in 0..2 {
      assert_abs_diff_eq!(w[i], w_gmv[i], epsilon = 1e-2);
    }
  }

  #[test]
  fn out_of_range_target_is_infeasible() {
    let moments = two_asset_moments();
    let err = weights_for_target_return(
      &moments,
      0.05,
      &Bounds::long_only(2),
      &SolverOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PortfolioError::InfeasibleConstraints(_)));
  }

  #[test]
  fn unreachable_budget_is_infeasible() {
    let moments = two_asset_moments();
    let bounds = Bounds::per_asset(&[(0.0, 0.4), (0.0, 0.4)]).unwrap();
    let err = gmv(&moments, &bounds, &SolverOptions::default()).unwrap_err();
    assert!(matches!(err, PortfolioError::InfeasibleConstraints(_)));
  }

  #[test]
  fn max_sharpe_matches_the_analytic_tangency_portfolio() {
    let moments = MomentsModel::from_raw(
      vec!["a".into(), "b".into()],
      array![0.10, 0.07],
      array![[0.04, 0.006], [0.006, 0.01]],
    )
    .unwrap();

    // wide bounds keep the box inactive
    let bounds = Bounds::uniform(2, -5.0, 5.0).unwrap();
    let opts = SolverOptions::default();

    let analytic = tangency_unconstrained(&moments, 0.02).unwrap();
    let numeric = max_sharpe(&moments, 0.02, &bounds, &opts).unwrap();

    for i in 0..2 {
      assert_abs_diff_eq!(numeric[i], analytic[i], epsilon = 1e-3);
    }
  }

  #[test]
  fn frontier_is_increasing_and_dominated_by_gmv_vol() {
    let moments = MomentsModel::from_raw(
      vec!["a".into(), "b".into(), "c".into()],
      array![0.01, 0.02, 0.015],
      array![
        [0.0004, 0.0001, 0.0],
        [0.0001, 0.0009, 0.0002],
        [0.0, 0.0002, 0.0006]
      ],
    )
    .unwrap();
    let bounds = Bounds::long_only(3);
    let opts = SolverOptions::default();

    let frontier = efficient_frontier(&moments, 10, &bounds, &opts).unwrap();
    assert!(frontier.len() >= 2);

    let gmv_vol = moments
      .portfolio_vol(&gmv(&moments, &bounds, &opts).unwrap())
      .unwrap();

    for pair in frontier.windows(2) {
      assert!(pair[1].target_return > pair[0].target_return);
    }
    for point in &frontier {
      assert!(point.volatility >= gmv_vol - 1e-4);
      assert_abs_diff_eq!(point.weights.sum(), 1.0, epsilon = 1e-6);
    }
  }

  #[traced_test]
  #[test]
  fn frontier_warns_on_infeasible_targets() {
    let moments = two_asset_moments();
    // upper bounds cap the reachable return below the best single asset
    let bounds = Bounds::per_asset(&[(0.0, 0.6), (0.0, 0.6)]).unwrap();
    let opts = SolverOptions::default();

    let frontier = efficient_frontier(&moments, 8, &bounds, &opts).unwrap();
    assert!(frontier.len() < 8);
    assert!(logs_contain("skipping infeasible frontier target"));
  }

  #[test]
  fn frontier_rejects_degenerate_point_counts() {
    let moments = two_asset_moments();
    let err = efficient_frontier(
      &moments,
      1,
      &Bounds::long_only(2),
      &SolverOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidParameter { .. }));
  }
}
