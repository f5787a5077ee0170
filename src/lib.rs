//! # portkit-rs
//!
//! Risk/return analytics for asset return series, mean-variance portfolio
//! optimization and CPPI simulation over Monte Carlo return paths.
//!
//! ## Modules
//!
//! | Module         | Description                                                      |
//! |----------------|------------------------------------------------------------------|
//! | [`series`]     | Immutable return series and aligned multi-asset return tables    |
//! | [`stats`]      | Drawdown, moments, VaR/CVaR, normality, annualization, summaries |
//! | [`portfolio`]  | Moments model, constrained minimizer, GMV/Sharpe/frontier        |
//! | [`simulation`] | Scheduled return-path generator and the CPPI state machine       |
//! | [`error`]      | Crate-wide typed errors                                          |
//!
//! ## Data flow
//!
//! Return tables feed the statistics layer and the moments model; the
//! optimizer turns moments into weight vectors and frontier points; the path
//! simulator feeds the CPPI engine, whose wealth trajectories flow back into
//! the statistics layer for the final risk summary.
//!
//! All computation is synchronous and free of shared mutable state; scenario
//! columns are independent and sampled/stepped in parallel with per-scenario
//! seeding, so parallel execution never changes numerical results.
//!
//! ## Example
//!
//! ```rust,ignore
//! use portkit_rs::portfolio::moments::MomentsModel;
//! use portkit_rs::portfolio::optimizer::gmv;
//! use portkit_rs::portfolio::types::{Bounds, SolverOptions};
//!
//! let moments = MomentsModel::from_returns(&table)?;
//! let weights = gmv(&moments, &Bounds::long_only(moments.n_assets()), &SolverOptions::default())?;
//! ```

pub mod error;
pub mod portfolio;
pub mod series;
pub mod simulation;
pub mod stats;

pub use crate::error::PortfolioError;
pub use crate::error::Result;
pub use crate::portfolio::moments::MomentsModel;
pub use crate::portfolio::types::Bounds;
pub use crate::portfolio::types::FrontierPoint;
pub use crate::portfolio::types::SolverOptions;
pub use crate::series::ReturnSeries;
pub use crate::series::ReturnTable;
pub use crate::simulation::cppi::CppiConfig;
pub use crate::simulation::cppi::CppiResult;
pub use crate::simulation::tv_gbm::PathEnsemble;
pub use crate::simulation::tv_gbm::Schedule;
pub use crate::simulation::tv_gbm::TvGbm;
