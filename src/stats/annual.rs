//! # Annualization
//!
//! Annualized return, annualized volatility and the Sharpe ratio for a
//! periodic return series sampled `periods_per_year` times a year.

use crate::error::PortfolioError;
use crate::error::Result;

fn check_periods(periods_per_year: f64) -> Result<()> {
  if periods_per_year <= 0.0 {
    return Err(PortfolioError::InvalidParameter {
      name: "periods_per_year",
      value: periods_per_year,
    });
  }
  Ok(())
}

/// Compound annual growth rate of a periodic return series,
/// `(prod(1 + r))^(ppy / n) - 1`.
pub fn annualize_return(returns: &[f64], periods_per_year: f64) -> Result<f64> {
  check_periods(periods_per_year)?;
  if returns.is_empty() {
    return Err(PortfolioError::InvalidInput(
      "annualized return requires a non-empty return series".into(),
    ));
  }

  let compounded = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r));
  if compounded <= 0.0 {
    return Err(PortfolioError::InvalidInput(
      "total growth must be positive to annualize".into(),
    ));
  }

  Ok(compounded.powf(periods_per_year / returns.len() as f64) - 1.0)
}

/// Annualized volatility: sample (n-1) standard deviation scaled by
/// `sqrt(periods_per_year)`.
pub fn annualize_vol(returns: &[f64], periods_per_year: f64) -> Result<f64> {
  check_periods(periods_per_year)?;
  if returns.len() < 2 {
    return Err(PortfolioError::InsufficientData {
      required: 2,
      actual: returns.len(),
    });
  }

  let n = returns.len() as f64;
  let mean = returns.iter().sum::<f64>() / n;
  let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
  Ok(var.sqrt() * periods_per_year.sqrt())
}

/// Annualized Sharpe ratio against a flat annual risk-free rate.
///
/// The risk-free rate is deflated to a per-period rate,
/// `(1 + rf)^(1 / ppy) - 1`, before excess returns are compounded.
pub fn sharpe_ratio(returns: &[f64], riskfree_rate: f64, periods_per_year: f64) -> Result<f64> {
  let rf_per_period = (1.0 + riskfree_rate).powf(1.0 / periods_per_year) - 1.0;
  let excess: Vec<f64> = returns.iter().map(|r| r - rf_per_period).collect();

  let ann_excess = annualize_return(&excess, periods_per_year)?;
  let ann_vol = annualize_vol(returns, periods_per_year)?;
  if ann_vol <= 0.0 {
    return Err(PortfolioError::InvalidInput(
      "Sharpe ratio is undefined for a zero-volatility series".into(),
    ));
  }

  Ok(ann_excess / ann_vol)
}
