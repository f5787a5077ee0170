//! # Jarque-Bera Normality Test
//!
//! $$
//! JB = \frac{n}{6}\left(s^2 + \frac{(k-3)^2}{4}\right)
//! $$
//!
//! with chi-square(2) asymptotics for the p-value.

use statrs::distribution::ChiSquared;
use statrs::distribution::ContinuousCDF;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::stats::risk::central_moments;

/// Smallest sample size the chi-square asymptotics are applied to.
pub const MIN_SAMPLE: usize = 8;

/// Configuration for the Jarque-Bera normality test.
#[derive(Debug, Clone, Copy)]
pub struct JarqueBeraConfig {
  /// Significance level used to compute `is_normal`.
  pub alpha: f64,
}

impl Default for JarqueBeraConfig {
  fn default() -> Self {
    Self { alpha: 0.01 }
  }
}

/// Result of the Jarque-Bera normality test.
#[derive(Debug, Clone, Copy)]
pub struct JarqueBera {
  /// JB test statistic.
  pub statistic: f64,
  /// p-value under chi-square(2) asymptotics.
  pub p_value: f64,
  /// Sample skewness.
  pub skewness: f64,
  /// Sample excess kurtosis.
  pub excess_kurtosis: f64,
  /// Whether normality is accepted at `alpha`, i.e. `p_value > alpha`.
  pub is_normal: bool,
}

/// Jarque-Bera test for normality of a return series.
pub fn jarque_bera(returns: &[f64], cfg: JarqueBeraConfig) -> Result<JarqueBera> {
  if returns.len() < MIN_SAMPLE {
    return Err(PortfolioError::InsufficientData {
      required: MIN_SAMPLE,
      actual: returns.len(),
    });
  }
  if returns.iter().any(|r| !r.is_finite()) {
    return Err(PortfolioError::InvalidInput(
      "Jarque-Bera requires finite observations".into(),
    ));
  }
  if !(cfg.alpha > 0.0 && cfg.alpha < 1.0) {
    return Err(PortfolioError::InvalidLevel(cfg.alpha));
  }

  let n = returns.len() as f64;
  let (_, m2, m3, m4) = central_moments(returns)?;

  if m2 <= 0.0 {
    // a degenerate constant sample is maximally non-normal
    return Ok(JarqueBera {
      statistic: f64::INFINITY,
      p_value: 0.0,
      skewness: 0.0,
      excess_kurtosis: f64::INFINITY,
      is_normal: false,
    });
  }

  let skewness = m3 / m2.powf(1.5);
  let excess_kurtosis = m4 / (m2 * m2) - 3.0;
  let statistic = n / 6.0 * (skewness * skewness + 0.25 * excess_kurtosis * excess_kurtosis);

  let chi2 = ChiSquared::new(2.0).expect("chi-square df=2 must be valid");
  let p_value = (1.0 - chi2.cdf(statistic)).clamp(0.0, 1.0);

  Ok(JarqueBera {
    statistic,
    p_value,
    skewness,
    excess_kurtosis,
    is_normal: p_value > cfg.alpha,
  })
}
