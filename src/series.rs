//! # Return Series
//!
//! Immutable containers for periodic asset returns: a single-asset
//! [`ReturnSeries`] and a multi-asset [`ReturnTable`] whose columns share one
//! common time index.

use crate::error::PortfolioError;
use crate::error::Result;

/// An ordered sequence of periodic returns for a single asset, indexed by a
/// strictly increasing time key (month index or any other ordinal).
///
/// Immutable once constructed; every accessor borrows.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnSeries {
  index: Vec<i64>,
  values: Vec<f64>,
}

impl ReturnSeries {
  /// Build a series from explicit time keys and returns.
  pub fn new(index: Vec<i64>, values: Vec<f64>) -> Result<Self> {
    if values.is_empty() {
      return Err(PortfolioError::InvalidInput(
        "return series must not be empty".into(),
      ));
    }

    if index.len() != values.len() {
      return Err(PortfolioError::DimensionMismatch {
        expected: values.len(),
        actual: index.len(),
      });
    }

    if index.windows(2).any(|w| w[1] <= w[0]) {
      return Err(PortfolioError::InvalidInput(
        "time keys must be strictly increasing".into(),
      ));
    }

    if values.iter().any(|v| !v.is_finite()) {
      return Err(PortfolioError::InvalidInput(
        "returns must be finite".into(),
      ));
    }

    Ok(Self { index, values })
  }

  /// Build a series with implicit time keys `0..n`.
  pub fn from_values(values: Vec<f64>) -> Result<Self> {
    let index = (0..values.len() as i64).collect();
    Self::new(index, values)
  }

  pub fn index(&self) -> &[i64] {
    &self.index
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

/// A collection of aligned [`ReturnSeries`] keyed by a unique asset id.
///
/// All columns share one common time index; the constructor rejects any
/// series whose index differs from the first. Column order is insertion
/// order and is preserved by everything downstream (moments, weights,
/// frontier points).
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnTable {
  assets: Vec<String>,
  index: Vec<i64>,
  columns: Vec<Vec<f64>>,
}

impl ReturnTable {
  /// Build a table from `(asset id, series)` pairs.
  pub fn from_series(series: Vec<(String, ReturnSeries)>) -> Result<Self> {
    let Some((_, first)) = series.first() else {
      return Err(PortfolioError::InvalidInput(
        "return table must contain at least one asset".into(),
      ));
    };

    let index = first.index().to_vec();
    let mut assets = Vec::with_capacity(series.len());
    let mut columns = Vec::with_capacity(series.len());

    for (id, s) in series {
      if s.len() != index.len() {
        return Err(PortfolioError::DimensionMismatch {
          expected: index.len(),
          actual: s.len(),
        });
      }
      if s.index() != index.as_slice() {
        return Err(PortfolioError::InvalidInput(format!(
          "asset {id} has a different time index"
        )));
      }
      if assets.contains(&id) {
        return Err(PortfolioError::InvalidInput(format!(
          "duplicate asset id {id}"
        )));
      }
      assets.push(id);
      columns.push(s.values().to_vec());
    }

    Ok(Self {
      assets,
      index,
      columns,
    })
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn index(&self) -> &[i64] {
    &self.index
  }

  /// Returns of a single asset, if present.
  pub fn column(&self, asset: &str) -> Option<&[f64]> {
    let pos = self.assets.iter().position(|a| a == asset)?;
    Some(&self.columns[pos])
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  pub fn n_periods(&self) -> usize {
    self.index.len()
  }

  /// Iterate `(asset id, returns)` in column order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
    self
      .assets
      .iter()
      .map(|a| a.as_str())
      .zip(self.columns.iter().map(|c| c.as_slice()))
  }
}
