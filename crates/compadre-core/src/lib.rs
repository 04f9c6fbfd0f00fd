//! COMPADRE core - shared-segment index and relatedness query server.
//!
//! This crate loads an IBD segment file once into a read-only index and
//! answers relatedness queries for pairs of individuals over a local TCP
//! socket. Matching pairs are run through the ERSA estimator and its
//! per-degree likelihoods are blended with the caller's prior.
//!
//! # Example
//!
//! ```rust,ignore
//! use compadre_core::{
//!     load_segment_file, BridgeSettings, CompadreServer, ErsaBridge, ServerSettings,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> compadre_core::Result<()> {
//!     let settings = ServerSettings::from_env("/data/segments.txt", 5050);
//!     let index = Arc::new(load_segment_file(&settings.match_file)?);
//!     let estimator = Arc::new(ErsaBridge::deploy(BridgeSettings::from_env())?);
//!
//!     let listener = CompadreServer::<ErsaBridge>::bind(&settings).await?;
//!     let server = CompadreServer::new(index, estimator, &settings.match_file);
//!     server.serve(listener).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod estimator;
pub mod ipc;
pub mod relatedness;
pub mod segments;

pub use config::{BridgeSettings, ServerSettings};
pub use error::{CompadreError, Result};
pub use estimator::{
    ErsaBridge, EstimatorOptions, EstimatorOutput, ModelRow, RelatednessEstimator,
};
pub use ipc::{CompadreServer, Request, ServeExit};
pub use relatedness::{PriorVector, RelatednessProportions, ResponseVector};
pub use segments::{
    load_segment_file, load_segments, IbdState, PairKey, SegmentFormat, SegmentIndex,
    SegmentIndexBuilder, SegmentRecord,
};
