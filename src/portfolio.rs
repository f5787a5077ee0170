//! # Portfolio Optimization
//!
//! | Module        | Description                                              |
//! |---------------|----------------------------------------------------------|
//! | [`types`]     | Weight bounds, frontier points, solver configuration     |
//! | [`moments`]   | Mean vector and covariance matrix from a return table    |
//! | [`solver`]    | Generic penalized Nelder-Mead constrained minimizer      |
//! | [`optimizer`] | GMV, target-return, maximum Sharpe, efficient frontier   |

pub mod moments;
pub mod optimizer;
pub mod solver;
pub mod types;
