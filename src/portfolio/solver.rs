//! # Constrained Minimizer
//!
//! $$
//! \min_{\mathbf{x}} \ f(\Pi_{[\mathbf{l},\mathbf{u}]}\mathbf{x})
//!   + \lambda\sum_k (\mathbf{c}_k^\top\mathbf{w} - b_k)^2
//! $$
//!
//! One generic penalized Nelder-Mead routine shared by every portfolio
//! problem: the raw simplex point is projected into the weight box, linear
//! equality residuals and the out-of-box distance are penalized with a
//! weight $\lambda$ that escalates between rounds until every residual is
//! within tolerance, and the budget is normalized exactly on the way out.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use tracing::debug;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::portfolio::types::Bounds;
use crate::portfolio::types::SolverOptions;

/// A linear equality constraint `coeffs' w = rhs`.
#[derive(Clone, Debug)]
pub struct LinearConstraint {
  pub coeffs: Array1<f64>,
  pub rhs: f64,
}

impl LinearConstraint {
  /// The full-investment constraint `sum(w) = 1`.
  pub fn budget(n: usize) -> Self {
    Self {
      coeffs: Array1::ones(n),
      rhs: 1.0,
    }
  }

  /// The target-return constraint `w' mu = target`.
  pub fn target_return(mean: &Array1<f64>, target: f64) -> Self {
    Self {
      coeffs: mean.clone(),
      rhs: target,
    }
  }

  fn residual(&self, w: &Array1<f64>) -> f64 {
    self.coeffs.dot(w) - self.rhs
  }

  fn is_budget(&self) -> bool {
    (self.rhs - 1.0).abs() < 1e-12 && self.coeffs.iter().all(|&c| (c - 1.0).abs() < 1e-12)
  }

  /// Range of `coeffs' w` reachable inside the box, ignoring the other
  /// constraints.
  fn box_range(&self, bounds: &Bounds) -> (f64, f64) {
    let mut lo = 0.0;
    let mut hi = 0.0;
    for ((&c, &l), &u) in self
      .coeffs
      .iter()
      .zip(bounds.lower().iter())
      .zip(bounds.upper().iter())
    {
      lo += (c * l).min(c * u);
      hi += (c * l).max(c * u);
    }
    (lo, hi)
  }
}

struct PenalizedCost<'a, F> {
  objective: &'a F,
  bounds: &'a Bounds,
  constraints: &'a [LinearConstraint],
  penalty: f64,
}

impl<F> CostFunction for PenalizedCost<'_, F>
where
  F: Fn(&Array1<f64>) -> f64,
{
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = self.bounds.clamp(x);

    let mut cost = (self.objective)(&w);
    for c in self.constraints {
      let r = c.residual(&w);
      cost += self.penalty * r * r;
    }

    let out_of_box: f64 = x
      .iter()
      .zip(w.iter())
      .map(|(xi, wi)| (xi - wi).powi(2))
      .sum();

    Ok(cost + self.penalty * out_of_box)
  }
}

/// Number of penalty-escalation rounds before giving up.
const PENALTY_ROUNDS: usize = 4;
/// Penalty multiplier between rounds.
const PENALTY_GROWTH: f64 = 100.0;

/// A simplex around `x0` with one bumped vertex per dimension.
fn simplex_around(x0: &[f64], bump: f64) -> Vec<Vec<f64>> {
  let mut simplex = Vec::with_capacity(x0.len() + 1);
  simplex.push(x0.to_vec());
  for i in 0..x0.len() {
    let mut point = x0.to_vec();
    point[i] += bump;
    simplex.push(point);
  }
  simplex
}

/// Equal weights plus one bumped vertex per dimension.
fn initial_simplex(n: usize) -> Vec<Vec<f64>> {
  simplex_around(&vec![1.0 / n as f64; n], 0.25)
}

/// Minimize `objective` over the weight box subject to linear equality
/// constraints.
///
/// Any failure to reach a feasible point, including solver non-convergence
/// or a non-finite best cost, surfaces as `InfeasibleConstraints`.
pub fn minimize<F>(
  objective: F,
  bounds: &Bounds,
  constraints: &[LinearConstraint],
  opts: &SolverOptions,
) -> Result<Array1<f64>>
where
  F: Fn(&Array1<f64>) -> f64,
{
  let n = bounds.len();
  if n == 0 {
    return Err(PortfolioError::InvalidInput(
      "cannot optimize over zero assets".into(),
    ));
  }

  for c in constraints {
    if c.coeffs.len() != n {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        actual: c.coeffs.len(),
      });
    }

    let (lo, hi) = c.box_range(bounds);
    if c.rhs < lo - opts.feasibility_tol || c.rhs > hi + opts.feasibility_tol {
      return Err(PortfolioError::InfeasibleConstraints(format!(
        "constraint rhs {} outside reachable range [{lo}, {hi}]",
        c.rhs
      )));
    }
  }

  // the quadratic penalty leaves an equilibrium residual proportional to
  // the objective's gradient over the penalty weight, so the penalty is
  // escalated round by round until every residual is within tolerance
  let mut penalty = opts.penalty;
  let mut simplex = initial_simplex(n);
  let mut worst_residual = f64::INFINITY;

  for round in 0..PENALTY_ROUNDS {
    let cost = PenalizedCost {
      objective: &objective,
      bounds,
      constraints,
      penalty,
    };

    let solver = NelderMead::new(simplex)
      .with_sd_tolerance(opts.sd_tolerance)
      .map_err(|e| PortfolioError::InfeasibleConstraints(e.to_string()))?;

    let res = Executor::new(cost, solver)
      .configure(|state| state.max_iters(opts.max_iters))
      .run()
      .map_err(|e| PortfolioError::InfeasibleConstraints(e.to_string()))?;

    let best_cost = res.state.best_cost;
    let best_x = res.state.best_param.ok_or_else(|| {
      PortfolioError::InfeasibleConstraints("solver returned no parameter".into())
    })?;

    if !best_cost.is_finite() {
      return Err(PortfolioError::InfeasibleConstraints(
        "solver converged to a non-finite cost".into(),
      ));
    }

    let mut w = bounds.clamp(&best_x);
    worst_residual = constraints
      .iter()
      .map(|c| c.residual(&w).abs())
      .fold(0.0, f64::max);

    if worst_residual <= opts.feasibility_tol {
      debug!(
        round,
        iterations = res.state.iter,
        best_cost,
        worst_residual,
        "constrained minimizer converged"
      );

      // the budget holds within tolerance; renormalize so it holds exactly
      if constraints.iter().any(LinearConstraint::is_budget) {
        let sum = w.sum();
        w.mapv_inplace(|wi| wi / sum);
      }
      return Ok(w);
    }

    penalty *= PENALTY_GROWTH;
    simplex = simplex_around(&best_x, 0.05);
  }

  Err(PortfolioError::InfeasibleConstraints(format!(
    "constraint residual {worst_residual} exceeds tolerance {}",
    opts.feasibility_tol
  )))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn minimizes_a_quadratic_on_the_simplex() {
    // min w'diag(4, 9)w with sum(w) = 1 has solution (9/13, 4/13)
    let bounds = Bounds::long_only(2);
    let w = minimize(
      |w: &Array1<f64>| 4.0 * w[0] * w[0] + 9.0 * w[1] * w[1],
      &bounds,
      &[LinearConstraint::budget(2)],
      &SolverOptions::default(),
    )
    .unwrap();

    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(w[0], 9.0 / 13.0, epsilon = 1e-2);
    assert_abs_diff_eq!(w[1], 4.0 / 13.0, epsilon = 1e-2);
  }

  #[test]
  fn respects_upper_bounds() {
    // the unconstrained solution puts everything on the first asset
    let bounds = Bounds::per_asset(&[(0.0, 0.6), (0.0, 1.0)]).unwrap();
    let w = minimize(
      |w: &Array1<f64>| 1.0 - w[0],
      &bounds,
      &[LinearConstraint::budget(2)],
      &SolverOptions::default(),
    )
    .unwrap();

    assert!(w[0] <= 0.6 + 1e-6);
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-6);
  }

  #[test]
  fn residuals_stay_within_tolerance_on_a_steep_objective() {
    // a moderate objective gradient pulls the iterate off the constraint
    // surface; the escalating penalty must still deliver a tight residual
    let bounds = Bounds::long_only(2);
    let mean = array![0.01, 0.02];
    let opts = SolverOptions::default();
    let w = minimize(
      |w: &Array1<f64>| 10.0 * w.dot(w),
      &bounds,
      &[
        LinearConstraint::budget(2),
        LinearConstraint::target_return(&mean, 0.018),
      ],
      &opts,
    )
    .unwrap();

    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-6);
    assert!((mean.dot(&w) - 0.018).abs() <= opts.feasibility_tol);
    assert_abs_diff_eq!(w[0], 0.2, epsilon = 1e-2);
    assert_abs_diff_eq!(w[1], 0.8, epsilon = 1e-2);
  }

  #[test]
  fn unreachable_rhs_fails_fast() {
    let bounds = Bounds::per_asset(&[(0.0, 0.3), (0.0, 0.3)]).unwrap();
    let err = minimize(
      |w: &Array1<f64>| w.dot(w),
      &bounds,
      &[LinearConstraint::budget(2)],
      &SolverOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, PortfolioError::InfeasibleConstraints(_)));
  }

  #[test]
  fn mismatched_constraint_length_is_rejected() {
    let bounds = Bounds::long_only(3);
    let err = minimize(
      |w: &Array1<f64>| w.dot(w),
      &bounds,
      &[LinearConstraint::target_return(&array![0.01, 0.02], 0.015)],
      &SolverOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, PortfolioError::DimensionMismatch { .. }));
  }

  #[test]
  fn identical_inputs_give_identical_weights() {
    let bounds = Bounds::long_only(3);
    let objective = |w: &Array1<f64>| w.dot(w);
    let constraints = [LinearConstraint::budget(3)];
    let opts = SolverOptions::default();

    let a = minimize(objective, &bounds, &constraints, &opts).unwrap();
    let b = minimize(objective, &bounds, &constraints, &opts).unwrap();
    assert_eq!(a, b);
  }
}
