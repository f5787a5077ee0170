//! # Risk Summary
//!
//! Per-asset risk/return summary over a [`ReturnTable`], composing the
//! annualization, moment and tail-risk statistics into one row per asset.

use crate::error::Result;
use crate::series::ReturnTable;
use crate::stats::annual::annualize_return;
use crate::stats::annual::annualize_vol;
use crate::stats::annual::sharpe_ratio;
use crate::stats::risk::cvar_historic;
use crate::stats::risk::drawdown;
use crate::stats::risk::kurtosis;
use crate::stats::risk::skewness;
use crate::stats::risk::var_gaussian;

/// One summary row: the headline risk/return statistics of a single asset.
#[derive(Clone, Debug)]
pub struct SummaryStats {
  pub asset: String,
  pub annualized_return: f64,
  pub annualized_vol: f64,
  pub skewness: f64,
  /// Raw (not excess) kurtosis.
  pub kurtosis: f64,
  /// Cornish-Fisher VaR at the 5% level.
  pub cornish_fisher_var_5: f64,
  /// Historic CVaR at the 5% level.
  pub historic_cvar_5: f64,
  pub sharpe_ratio: f64,
  pub max_drawdown: f64,
}

/// Summarize every asset of a return table, in table column order.
pub fn summary_stats(
  table: &ReturnTable,
  riskfree_rate: f64,
  periods_per_year: f64,
) -> Result<Vec<SummaryStats>> {
  table
    .iter()
    .map(|(asset, returns)| {
      Ok(SummaryStats {
        asset: asset.to_string(),
        annualized_return: annualize_return(returns, periods_per_year)?,
        annualized_vol: annualize_vol(returns, periods_per_year)?,
        skewness: skewness(returns)?,
        kurtosis: kurtosis(returns)?,
        cornish_fisher_var_5: var_gaussian(returns, 5.0, true)?,
        historic_cvar_5: cvar_historic(returns, 5.0)?,
        sharpe_ratio: sharpe_ratio(returns, riskfree_rate, periods_per_year)?,
        max_drawdown: drawdown(returns)?.max_drawdown(),
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::series::ReturnSeries;

  #[test]
  fn summarizes_every_asset_in_table_order() {
    let equity = vec![
      0.021, -0.034, 0.017, 0.042, -0.011, 0.008, 0.025, -0.019, 0.013, 0.031, -0.006, 0.015,
    ];
    let bonds = vec![
      0.004, 0.006, -0.002, 0.003, 0.005, -0.001, 0.004, 0.002, 0.006, -0.003, 0.005, 0.003,
    ];

    let table = ReturnTable::from_series(vec![
      (
        "equity".into(),
        ReturnSeries::from_values(equity.clone()).unwrap(),
      ),
      ("bonds".into(), ReturnSeries::from_values(bonds).unwrap()),
    ])
    .unwrap();

    let rows = summary_stats(&table, 0.03, 12.0).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].asset, "equity");
    assert_eq!(rows[1].asset, "bonds");

    // each field matches the underlying statistic it composes
    assert_abs_diff_eq!(
      rows[0].max_drawdown,
      drawdown(&equity).unwrap().max_drawdown(),
      epsilon = 1e-12
    );
    assert_abs_diff_eq!(
      rows[0].annualized_vol,
      annualize_vol(&equity, 12.0).unwrap(),
      epsilon = 1e-12
    );
    assert_abs_diff_eq!(
      rows[0].historic_cvar_5,
      cvar_historic(&equity, 5.0).unwrap(),
      epsilon = 1e-12
    );

    // equity is the riskier column on every axis that should say so
    assert!(rows[0].annualized_vol > rows[1].annualized_vol);
    assert!(rows[0].max_drawdown < rows[1].max_drawdown);
  }
}
