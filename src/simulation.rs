//! # Forward Simulation
//!
//! | Module     | Description                                                 |
//! |------------|-------------------------------------------------------------|
//! | [`tv_gbm`] | Scheduled-parameter Monte Carlo return-path generator       |
//! | [`cppi`]   | Constant Proportion Portfolio Insurance over paths/ensembles|

pub mod cppi;
pub mod tv_gbm;
