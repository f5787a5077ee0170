//! # Risk Statistics
//!
//! Drawdown curves, higher standardized moments, semi-deviation and the
//! VaR/CVaR family over a slice of periodic returns.
//!
//! The Cornish-Fisher quantile correction used by [`var_gaussian`] is
//!
//! $$
//! \tilde z = z + \frac{(z^2-1)s}{6} + \frac{(z^3-3z)(k-3)}{24}
//!   - \frac{(2z^3-5z)s^2}{36}
//! $$
//!
//! with sample skewness $s$ and raw kurtosis $k$.

use ndarray::Array1;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;

use crate::error::PortfolioError;
use crate::error::Result;

/// Wealth-index trajectory of a return series with its running peak and
/// relative drawdown.
#[derive(Clone, Debug)]
pub struct Drawdown {
  /// Compounded wealth from a unit start, `cumprod(1 + r)`.
  pub wealth_index: Array1<f64>,
  /// Running maximum of the wealth index.
  pub previous_peaks: Array1<f64>,
  /// `wealth_index / previous_peaks - 1`, always `<= 0`.
  pub drawdown: Array1<f64>,
}

impl Drawdown {
  /// Most negative drawdown over the trajectory.
  pub fn max_drawdown(&self) -> f64 {
    self.drawdown.iter().copied().fold(0.0, f64::min)
  }
}

/// Compound a return series into its drawdown trajectory.
pub fn drawdown(returns: &[f64]) -> Result<Drawdown> {
  if returns.is_empty() {
    return Err(PortfolioError::InvalidInput(
      "drawdown requires a non-empty return series".into(),
    ));
  }

  let n = returns.len();
  let mut wealth_index = Array1::<f64>::zeros(n);
  let mut previous_peaks = Array1::<f64>::zeros(n);
  let mut dd = Array1::<f64>::zeros(n);

  let mut wealth = 1.0;
  let mut peak = f64::MIN;
  for (t, &r) in returns.iter().enumerate() {
    wealth *= 1.0 + r;
    peak = peak.max(wealth);
    wealth_index[t] = wealth;
    previous_peaks[t] = peak;
    dd[t] = wealth / peak - 1.0;
  }

  Ok(Drawdown {
    wealth_index,
    previous_peaks,
    drawdown: dd,
  })
}

/// Mean and the second through fourth central moments, population (n)
/// normalized.
pub(crate) fn central_moments(returns: &[f64]) -> Result<(f64, f64, f64, f64)> {
  if returns.is_empty() {
    return Err(PortfolioError::InvalidInput(
      "moments require a non-empty return series".into(),
    ));
  }

  let n = returns.len() as f64;
  let mean = returns.iter().sum::<f64>() / n;

  let mut m2 = 0.0;
  let mut m3 = 0.0;
  let mut m4 = 0.0;
  for &r in returns {
    let d = r - mean;
    let d2 = d * d;
    m2 += d2;
    m3 += d2 * d;
    m4 += d2 * d2;
  }

  Ok((mean, m2 / n, m3 / n, m4 / n))
}

/// Third standardized central moment, population sigma.
pub fn skewness(returns: &[f64]) -> Result<f64> {
  let (_, m2, m3, _) = central_moments(returns)?;
  if m2 <= 0.0 {
    return Err(PortfolioError::InvalidInput(
      "skewness is undefined for a zero-variance series".into(),
    ));
  }
  Ok(m3 / m2.powf(1.5))
}

/// Fourth standardized central moment, population sigma. Raw, not excess:
/// a normal sample is near 3.0.
pub fn kurtosis(returns: &[f64]) -> Result<f64> {
  let (_, m2, _, m4) = central_moments(returns)?;
  if m2 <= 0.0 {
    return Err(PortfolioError::InvalidInput(
      "kurtosis is undefined for a zero-variance series".into(),
    ));
  }
  Ok(m4 / (m2 * m2))
}

/// Population standard deviation of the strictly negative observations
/// around their own mean. Returns 0.0 when the series has no negative
/// observations.
pub fn semideviation(returns: &[f64]) -> Result<f64> {
  if returns.is_empty() {
    return Err(PortfolioError::InvalidInput(
      "semideviation requires a non-empty return series".into(),
    ));
  }

  let negatives: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
  if negatives.is_empty() {
    return Ok(0.0);
  }

  let n = negatives.len() as f64;
  let mean = negatives.iter().sum::<f64>() / n;
  let var = negatives.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
  Ok(var.sqrt())
}

/// Linear-interpolation percentile at `level` in (0, 100).
fn percentile(values: &[f64], level: f64) -> f64 {
  let mut sorted = values.to_vec();
  sorted.sort_by(f64::total_cmp);

  let rank = level / 100.0 * (sorted.len() - 1) as f64;
  let lo = rank.floor() as usize;
  let hi = rank.ceil() as usize;
  if lo == hi {
    return sorted[lo];
  }
  sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
}

fn check_level(level: f64) -> Result<()> {
  if !(level > 0.0 && level < 100.0) {
    return Err(PortfolioError::InvalidLevel(level));
  }
  Ok(())
}

fn check_non_empty(returns: &[f64], what: &str) -> Result<()> {
  if returns.is_empty() {
    return Err(PortfolioError::InvalidInput(format!(
      "{what} requires a non-empty return series"
    )));
  }
  Ok(())
}

/// Historic Value at Risk at `level` percent: the negated `level`-th
/// percentile of the return distribution.
///
/// The sign is surfaced raw: when the percentile return is a gain the
/// result is negative.
pub fn var_historic(returns: &[f64], level: f64) -> Result<f64> {
  check_level(level)?;
  check_non_empty(returns, "historic VaR")?;
  Ok(-percentile(returns, level))
}

/// Historic Conditional Value at Risk at `level` percent: the negated mean
/// of all observations at or below the `level`-th percentile.
///
/// Uses the same interpolated percentile as [`var_historic`], so
/// `cvar_historic >= var_historic` at any level.
pub fn cvar_historic(returns: &[f64], level: f64) -> Result<f64> {
  check_level(level)?;
  check_non_empty(returns, "historic CVaR")?;

  let cutoff = percentile(returns, level);
  let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= cutoff).collect();
  Ok(-(tail.iter().sum::<f64>() / tail.len() as f64))
}

/// Parametric Gaussian VaR at `level` percent, optionally with the
/// Cornish-Fisher quantile correction for skewness and kurtosis.
///
/// Extreme higher moments can invert the sign of the adjusted quantile;
/// the result is surfaced raw, never clamped.
pub fn var_gaussian(returns: &[f64], level: f64, modified: bool) -> Result<f64> {
  check_level(level)?;
  check_non_empty(returns, "Gaussian VaR")?;

  let standard_normal = Normal::new(0.0, 1.0).expect("standard normal must be valid");
  let mut z = standard_normal.inverse_cdf(level / 100.0);

  if modified {
    let s = skewness(returns)?;
    let k = kurtosis(returns)?;
    z = z
      + (z * z - 1.0) * s / 6.0
      + (z.powi(3) - 3.0 * z) * (k - 3.0) / 24.0
      - (2.0 * z.powi(3) - 5.0 * z) * s * s / 36.0;
  }

  let (mean, m2, _, _) = central_moments(returns)?;
  Ok(-(mean + z * m2.sqrt()))
}
