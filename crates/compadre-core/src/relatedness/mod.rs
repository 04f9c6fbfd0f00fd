//! Relatedness post-processing.
//!
//! Estimator rows are folded into four degree-bucket proportions
//! ([`RelatednessProportions`]), which are then scaled into the share of the
//! caller's prior left over after the two closest degrees ([`PriorVector::blend`]).

pub mod blend;
pub mod proportions;

pub use blend::{PriorVector, ResponseVector};
pub use proportions::{DegreeBucket, RelatednessProportions};
