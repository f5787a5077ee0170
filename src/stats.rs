//! # Return Series Statistics
//!
//! | Module        | Description                                               |
//! |---------------|-----------------------------------------------------------|
//! | [`risk`]      | Drawdown, higher moments, semi-deviation, VaR/CVaR family |
//! | [`normality`] | Jarque-Bera normality test                                |
//! | [`annual`]    | Annualized return/volatility and Sharpe ratio             |
//! | [`summary`]   | Per-asset risk/return summary over a return table         |

pub mod annual;
pub mod normality;
pub mod risk;
pub mod summary;
