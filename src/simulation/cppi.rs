//! # CPPI Simulator
//!
//! $$
//! w_t = \mathrm{clamp}\!\left(m\,\frac{W_t - F_t}{W_t},\,0,\,c\right)
//! $$
//!
//! Constant Proportion Portfolio Insurance stepped over a supplied return
//! series or a whole [`PathEnsemble`], with a fixed or drawdown-based floor
//! and an optional upside cap on the risky weight.

use ndarray::Array1;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::simulation::tv_gbm::PathEnsemble;

/// CPPI strategy parameters.
#[derive(Clone, Debug)]
pub struct CppiConfig {
  /// Cushion multiplier.
  pub multiplier: f64,
  /// Initial floor as a fraction of the initial wealth; ignored when
  /// `max_drawdown` is set.
  pub floor_ratio: f64,
  pub initial_value: f64,
  /// Annual rate of the safe leg when no explicit safe series is given.
  pub riskfree_rate: f64,
  pub steps_per_year: f64,
  /// When set, the floor ratchets up with the running peak to cap the
  /// drawdown at this fraction.
  pub max_drawdown: Option<f64>,
  /// Upper limit on the risky weight; 1.0 means no leverage and no cap.
  pub cap: f64,
}

impl Default for CppiConfig {
  fn default() -> Self {
    Self {
      multiplier: 3.0,
      floor_ratio: 0.8,
      initial_value: 1000.0,
      riskfree_rate: 0.03,
      steps_per_year: 12.0,
      max_drawdown: None,
      cap: 1.0,
    }
  }
}

impl CppiConfig {
  fn validate(&self) -> Result<()> {
    if self.multiplier <= 0.0 {
      return Err(PortfolioError::InvalidParameter {
        name: "multiplier",
        value: self.multiplier,
      });
    }
    if !(0.0..=1.0).contains(&self.floor_ratio) {
      return Err(PortfolioError::InvalidParameter {
        name: "floor_ratio",
        value: self.floor_ratio,
      });
    }
    if !(self.cap > 0.0 && self.cap <= 1.0) {
      return Err(PortfolioError::InvalidParameter {
        name: "cap",
        value: self.cap,
      });
    }
    if self.initial_value <= 0.0 {
      return Err(PortfolioError::InvalidParameter {
        name: "initial_value",
        value: self.initial_value,
      });
    }
    if self.steps_per_year <= 0.0 {
      return Err(PortfolioError::InvalidParameter {
        name: "steps_per_year",
        value: self.steps_per_year,
      });
    }
    if let Some(dd) = self.max_drawdown {
      if !(dd > 0.0 && dd < 1.0) {
        return Err(PortfolioError::InvalidParameter {
          name: "max_drawdown",
          value: dd,
        });
      }
    }
    Ok(())
  }
}

/// Mutable per-run state, owned by one scenario and discarded at run end.
struct CppiState {
  wealth: f64,
  floor: f64,
  peak: f64,
  breached: bool,
  absorbed: bool,
}

impl CppiState {
  fn new(cfg: &CppiConfig) -> Self {
    let floor = match cfg.max_drawdown {
      Some(dd) => cfg.initial_value * (1.0 - dd),
      None => cfg.initial_value * cfg.floor_ratio,
    };

    Self {
      wealth: cfg.initial_value,
      floor,
      peak: cfg.initial_value,
      breached: false,
      absorbed: false,
    }
  }

  /// Advance one step; returns the risky weight applied during the step.
  fn step(&mut self, cfg: &CppiConfig, risky_return: f64, safe_return: f64) -> f64 {
    if let Some(dd) = cfg.max_drawdown {
      self.floor = self.floor.max(self.peak * (1.0 - dd));
    }

    // wealth at zero is absorbing: the risky weight is undefined there and
    // forced to 0 for all remaining steps
    let risky_weight = if self.absorbed || self.wealth <= 0.0 {
      self.absorbed = true;
      0.0
    } else {
      let cushion = (self.wealth - self.floor).max(0.0);
      (cfg.multiplier * cushion / self.wealth).clamp(0.0, cfg.cap)
    };

    let safe_weight = 1.0 - risky_weight;
    self.wealth *= risky_weight * (1.0 + risky_return) + safe_weight * (1.0 + safe_return);
    self.peak = self.peak.max(self.wealth);

    if self.wealth <= self.floor {
      self.breached = true;
    }
    if self.wealth <= 0.0 {
      self.absorbed = true;
    }

    risky_weight
  }
}

/// Trajectory of one CPPI run: per-step wealth, risky weight and floor,
/// plus the terminal wealth and a sticky floor-breach flag.
#[derive(Clone, Debug)]
pub struct CppiResult {
  pub wealth: Array1<f64>,
  pub risky_weight: Array1<f64>,
  pub floor: Array1<f64>,
  pub terminal_wealth: f64,
  pub floor_breached: bool,
}

/// Run the CPPI strategy over one risky return path.
///
/// The safe leg is an explicit per-step series or, when `None`, the flat
/// per-step rate `riskfree_rate / steps_per_year`.
pub fn run_cppi(risky: &[f64], safe: Option<&[f64]>, cfg: &CppiConfig) -> Result<CppiResult> {
  cfg.validate()?;

  let n = risky.len();
  if n == 0 {
    return Err(PortfolioError::InvalidInput(
      "CPPI requires a non-empty risky return series".into(),
    ));
  }

  let safe: Vec<f64> = match safe {
    Some(s) if s.len() != n => {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        actual: s.len(),
      });
    }
    Some(s) => s.to_vec(),
    None => vec![cfg.riskfree_rate / cfg.steps_per_year; n],
  };

  let mut state = CppiState::new(cfg);
  let mut wealth = Array1::<f64>::zeros(n);
  let mut risky_weight = Array1::<f64>::zeros(n);
  let mut floor = Array1::<f64>::zeros(n);

  for t in 0..n {
    let w = state.step(cfg, risky[t], safe[t]);
    wealth[t] = state.wealth;
    risky_weight[t] = w;
    floor[t] = state.floor;
  }

  Ok(CppiResult {
    terminal_wealth: state.wealth,
    floor_breached: state.breached,
    wealth,
    risky_weight,
    floor,
  })
}

/// Trajectories of a whole scenario ensemble, in scenario index order.
#[derive(Clone, Debug)]
pub struct CppiEnsemble {
  /// Shape `(n_steps, n_scenarios)`.
  pub wealth: Array2<f64>,
  pub risky_weight: Array2<f64>,
  pub floor: Array2<f64>,
  pub terminal: Array1<f64>,
  pub breached: Vec<bool>,
}

/// Terminal-wealth aggregation of a CPPI ensemble.
#[derive(Clone, Debug)]
pub struct CppiSummary {
  pub mean_terminal: f64,
  /// Midpoint median: the central-pair average for even scenario counts.
  pub median_terminal: f64,
  /// Fraction of scenarios that touched the floor.
  pub breach_probability: f64,
  /// Mean shortfall below the terminal floor, conditional on a breach;
  /// 0.0 when no scenario breached.
  pub expected_shortfall: f64,
}

impl CppiEnsemble {
  pub fn n_scenarios(&self) -> usize {
    self.terminal.len()
  }

  pub fn summary(&self) -> CppiSummary {
    let n = self.terminal.len() as f64;
    let mean_terminal = self.terminal.sum() / n;

    let mut sorted = self.terminal.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median_terminal = if sorted.len() % 2 == 0 {
      0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
      sorted[mid]
    };

    let breaches = self.breached.iter().filter(|&&b| b).count();
    let breach_probability = breaches as f64 / n;

    let last_floor = self.floor.row(self.floor.nrows() - 1);
    let expected_shortfall = if breaches == 0 {
      0.0
    } else {
      self
        .breached
        .iter()
        .enumerate()
        .filter(|(_, &b)| b)
        .map(|(j, _)| (last_floor[j] - self.terminal[j]).max(0.0))
        .sum::<f64>()
        / breaches as f64
    };

    CppiSummary {
      mean_terminal,
      median_terminal,
      breach_probability,
      expected_shortfall,
    }
  }
}

/// Step the CPPI strategy over every scenario column of an ensemble, in
/// parallel, with the flat risk-free safe leg.
pub fn run_cppi_ensemble(ensemble: &PathEnsemble, cfg: &CppiConfig) -> Result<CppiEnsemble> {
  cfg.validate()?;

  let n_steps = ensemble.n_steps();
  let n_scenarios = ensemble.n_scenarios();
  if n_steps == 0 || n_scenarios == 0 {
    return Err(PortfolioError::InvalidInput(
      "CPPI requires a non-empty ensemble".into(),
    ));
  }

  let runs: Vec<CppiResult> = (0..n_scenarios)
    .into_par_iter()
    .map(|j| {
      let risky = ensemble.returns.column(j).to_vec();
      run_cppi(&risky, None, cfg)
    })
    .collect::<Result<_>>()?;

  let mut wealth = Array2::<f64>::zeros((n_steps, n_scenarios));
  let mut risky_weight = Array2::<f64>::zeros((n_steps, n_scenarios));
  let mut floor = Array2::<f64>::zeros((n_steps, n_scenarios));
  let mut terminal = Array1::<f64>::zeros(n_scenarios);
  let mut breached = Vec::with_capacity(n_scenarios);

  for (j, run) in runs.iter().enumerate() {
    for t in 0..n_steps {
      wealth[[t, j]] = run.wealth[t];
      risky_weight[[t, j]] = run.risky_weight[t];
      floor[[t, j]] = run.floor[t];
    }
    terminal[j] = run.terminal_wealth;
    breached.push(run.floor_breached);
  }

  debug!(
    n_scenarios,
    breaches = breached.iter().filter(|&&b| b).count(),
    "completed CPPI ensemble"
  );

  Ok(CppiEnsemble {
    wealth,
    risky_weight,
    floor,
    terminal,
    breached,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::simulation::tv_gbm::Schedule;
  use crate::simulation::tv_gbm::TvGbm;

  fn base_config() -> CppiConfig {
    CppiConfig {
      multiplier: 3.0,
      floor_ratio: 0.8,
      initial_value: 100.0,
      riskfree_rate: 0.0,
      steps_per_year: 12.0,
      max_drawdown: None,
      cap: 1.0,
    }
  }

  #[test]
  fn declining_path_breaches_and_absorbs() {
    let risky = vec![-0.4; 6];
    let safe = vec![0.0; 6];
    let result = run_cppi(&risky, Some(&safe), &base_config()).unwrap();

    assert!(result.floor_breached);

    // first step allocates 3 * 20 / 100 = 60% and loses through the floor
    assert_abs_diff_eq!(result.risky_weight[0], 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(result.wealth[0], 76.0, epsilon = 1e-9);

    // below the floor the cushion is zero and the risky weight stays there
    for t in 1..6 {
      assert_abs_diff_eq!(result.risky_weight[t], 0.0, epsilon = 1e-12);
      assert_abs_diff_eq!(result.wealth[t], 76.0, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(result.terminal_wealth, 76.0, epsilon = 1e-9);
  }

  #[test]
  fn cap_limits_the_risky_weight_on_a_rising_path() {
    let risky = vec![0.10; 12];
    let cfg = CppiConfig {
      cap: 0.5,
      ..base_config()
    };
    let result = run_cppi(&risky, None, &cfg).unwrap();

    for t in 0..12 {
      assert!(result.risky_weight[t] <= 0.5 + 1e-12);
    }
    assert!(!result.floor_breached);
    assert!(result.terminal_wealth > 100.0);
  }

  #[test]
  fn drawdown_floor_ratchets_with_the_peak() {
    let risky = vec![0.2, 0.2, -0.1, -0.1];
    let cfg = CppiConfig {
      max_drawdown: Some(0.25),
      ..base_config()
    };
    let result = run_cppi(&risky, Some(&[0.0; 4]), &cfg).unwrap();

    // the floor never falls and follows 75% of the running peak
    for t in 1..4 {
      assert!(result.floor[t] >= result.floor[t - 1] - 1e-12);
      assert!(result.floor[t] >= 0.75 * 100.0 - 1e-12);
    }
    assert!(result.floor[3] > 75.0);
  }

  #[test]
  fn zero_wealth_is_absorbing() {
    // a total first-step loss with full risky allocation
    let cfg = CppiConfig {
      floor_ratio: 0.0,
      multiplier: 10.0,
      ..base_config()
    };
    let risky = vec![-1.0, 0.5, 0.5];
    let result = run_cppi(&risky, Some(&[0.0; 3]), &cfg).unwrap();

    assert_abs_diff_eq!(result.wealth[0], 0.0, epsilon = 1e-12);
    for t in 1..3 {
      assert_abs_diff_eq!(result.risky_weight[t], 0.0, epsilon = 1e-12);
      assert_abs_diff_eq!(result.wealth[t], 0.0, epsilon = 1e-12);
    }
  }

  #[test]
  fn invalid_parameters_are_rejected() {
    let risky = [0.01, 0.02];

    let cfg = CppiConfig {
      multiplier: 0.0,
      ..base_config()
    };
    assert!(matches!(
      run_cppi(&risky, None, &cfg),
      Err(PortfolioError::InvalidParameter { name: "multiplier", .. })
    ));

    let cfg = CppiConfig {
      floor_ratio: 1.2,
      ..base_config()
    };
    assert!(matches!(
      run_cppi(&risky, None, &cfg),
      Err(PortfolioError::InvalidParameter { name: "floor_ratio", .. })
    ));

    let cfg = CppiConfig {
      cap: 0.0,
      ..base_config()
    };
    assert!(matches!(
      run_cppi(&risky, None, &cfg),
      Err(PortfolioError::InvalidParameter { name: "cap", .. })
    ));
  }

  #[test]
  fn mismatched_safe_series_is_rejected() {
    let err = run_cppi(&[0.01, 0.02], Some(&[0.0]), &base_config()).unwrap_err();
    assert!(matches!(err, PortfolioError::DimensionMismatch { .. }));
  }

  #[test]
  fn summary_median_averages_the_central_pair() {
    use ndarray::array;

    let mut ensemble = CppiEnsemble {
      wealth: Array2::zeros((1, 4)),
      risky_weight: Array2::zeros((1, 4)),
      floor: Array2::zeros((1, 4)),
      terminal: array![4.0, 1.0, 3.0, 2.0],
      breached: vec![false; 4],
    };
    assert_abs_diff_eq!(ensemble.summary().median_terminal, 2.5, epsilon = 1e-12);

    ensemble.wealth = Array2::zeros((1, 3));
    ensemble.risky_weight = Array2::zeros((1, 3));
    ensemble.floor = Array2::zeros((1, 3));
    ensemble.terminal = array![3.0, 1.0, 2.0];
    ensemble.breached = vec![false; 3];
    assert_abs_diff_eq!(ensemble.summary().median_terminal, 2.0, epsilon = 1e-12);
  }

  #[test]
  fn ensemble_matches_per_column_runs() {
    let model = TvGbm::new(
      Schedule::flat(0.07),
      Schedule::flat(0.15),
      12,
      16,
      12.0,
      100.0,
      11,
    );
    let ensemble = model.sample().unwrap();

    let cfg = CppiConfig {
      riskfree_rate: 0.03,
      ..base_config()
    };
    let batch = run_cppi_ensemble(&ensemble, &cfg).unwrap();

    for j in 0..16 {
      let risky = ensemble.returns.column(j).to_vec();
      let single = run_cppi(&risky, None, &cfg).unwrap();

      assert_abs_diff_eq!(batch.terminal[j], single.terminal_wealth, epsilon = 1e-12);
      assert_eq!(batch.breached[j], single.floor_breached);
      for t in 0..12 {
        assert_abs_diff_eq!(batch.wealth[[t, j]], single.wealth[t], epsilon = 1e-12);
        assert_abs_diff_eq!(
          batch.risky_weight[[t, j]],
          single.risky_weight[t],
          epsilon = 1e-12
        );
      }
    }

    let summary = batch.summary();
    assert!(summary.mean_terminal > 0.0);
    assert!((0.0..=1.0).contains(&summary.breach_probability));
    assert!(summary.expected_shortfall >= 0.0);
  }
}
