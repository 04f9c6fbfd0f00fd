//! External relatedness estimator (ERSA).
//!
//! The server only sees the [`RelatednessEstimator`] port; [`ErsaBridge`] is
//! the production adapter.

pub mod bridge;
pub mod types;

pub use bridge::{ErsaBridge, ERSA_BRIDGE_SCRIPT};
pub use types::{EstimatorOptions, EstimatorOutput, ModelRow, RelatednessEstimator};
