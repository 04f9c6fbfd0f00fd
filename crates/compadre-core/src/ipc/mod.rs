//! Local socket protocol.
//!
//! One request per TCP connection, `|`-delimited, answered with a single
//! plain-text reply before the server closes the connection.
//!
//! # Architecture
//!
//! - **Protocol**: request parsing into the closed [`Request`] enum
//! - **Server**: sequential accept loop dispatching to bulk, pairwise or close

pub mod protocol;
pub mod server;

pub use protocol::{PairwiseQuery, Request};
pub use server::{CompadreServer, Reply, ServeExit};
