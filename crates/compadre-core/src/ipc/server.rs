//! TCP request server.
//!
//! Connections are handled strictly one at a time: accept, read one message,
//! run it to completion (including any estimator call), reply, close. The
//! segment index is shared read-only through an `Arc` and never mutated here.

use super::protocol::{error_reply, read_message, PairwiseQuery, Request};
use crate::config::{ersa_dir_for, ProtocolConfig, SegmentConfig, ServerSettings};
use crate::error::IoResultExt;
use crate::estimator::{EstimatorOptions, RelatednessEstimator};
use crate::relatedness::{PriorVector, RelatednessProportions};
use crate::segments::{canonical_id, SegmentIndex};
use crate::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// What the server does after answering a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub body: String,
    pub shutdown: bool,
}

impl Reply {
    fn send(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            shutdown: false,
        }
    }
}

/// Why [`CompadreServer::serve`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeExit {
    /// A client sent `close`.
    CloseRequested,
}

/// Relatedness query server over a frozen segment index.
pub struct CompadreServer<E: RelatednessEstimator> {
    index: Arc<SegmentIndex>,
    estimator: Arc<E>,
    match_file: PathBuf,
}

impl<E: RelatednessEstimator> CompadreServer<E> {
    pub fn new(index: Arc<SegmentIndex>, estimator: Arc<E>, match_file: impl Into<PathBuf>) -> Self {
        Self {
            index,
            estimator,
            match_file: match_file.into(),
        }
    }

    /// Bind the listening socket for `settings`.
    pub async fn bind(settings: &ServerSettings) -> Result<TcpListener> {
        let listener = TcpListener::bind((settings.host.as_str(), settings.port)).await?;
        info!("Listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Accept and answer connections until a `close` request arrives.
    ///
    /// The listener is dropped on return, so later connection attempts are
    /// refused.
    pub async fn serve(&self, listener: TcpListener) -> Result<ServeExit> {
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept error: {}", e);
                    continue;
                }
            };

            if self.handle_connection(stream, peer_addr).await {
                info!("Close requested by {}, shutting down", peer_addr);
                return Ok(ServeExit::CloseRequested);
            }
        }
    }

    /// Answer one connection. Returns whether the server should stop.
    async fn handle_connection(&self, mut stream: TcpStream, peer_addr: SocketAddr) -> bool {
        debug!("Connection from {}", peer_addr);

        let reply = match read_message(&mut stream).await {
            Ok(Some(message)) => self.respond(&message).await,
            Ok(None) => {
                debug!("Connection {} closed without a request", peer_addr);
                return false;
            }
            Err(e) => {
                warn!("Unreadable request from {}: {}", peer_addr, e);
                Reply::send(error_reply(&e))
            }
        };

        if let Err(e) = write_reply(&mut stream, &reply.body).await {
            debug!("Connection {} ended before reply: {}", peer_addr, e);
        }
        reply.shutdown
    }

    /// Compute the reply for one request message.
    pub async fn respond(&self, message: &str) -> Reply {
        let request = match Request::parse(message) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejecting request: {}", e);
                return Reply::send(error_reply(&e));
            }
        };

        let result = match request {
            Request::Close => {
                return Reply {
                    body: ProtocolConfig::CLOSE_ACK.to_string(),
                    shutdown: true,
                }
            }
            Request::Bulk => self.run_bulk().await,
            Request::Pairwise(query) => self.run_pairwise(&query).await,
        };

        match result {
            Ok(body) => Reply::send(body),
            Err(e) => {
                warn!("Request failed: {}", e);
                Reply::send(error_reply(&e))
            }
        }
    }

    /// Run the estimator over every pair, writing results next to the
    /// segment file. Replies with the output path prefix.
    async fn run_bulk(&self) -> Result<String> {
        let ersa_dir = ersa_dir_for(&self.match_file);
        std::fs::create_dir_all(&ersa_dir).with_path(&ersa_dir)?;
        let prefix = ersa_dir
            .join(SegmentConfig::BULK_OUTPUT_STEM)
            .to_string_lossy()
            .into_owned();

        info!("Running estimator over {} pairs", self.index.len());
        let options = EstimatorOptions::bulk(self.index.to_json()?, self.match_file.clone(), &prefix);
        self.estimator.run(options).await?;
        info!("Estimator output written to {}.*", prefix);

        Ok(prefix)
    }

    /// Answer a single-pair query, falling back to the caller's prior when
    /// there is nothing to estimate from.
    async fn run_pairwise(&self, query: &PairwiseQuery) -> Result<String> {
        let key = query.pair_key();
        let Some(segment_dict) = self.index.pair_json(&key)? else {
            debug!("{} shares no qualifying segments, returning prior", key);
            return Ok(query.prior.clone());
        };

        let prior = PriorVector::parse(&query.prior)?;
        let id1 = canonical_id(&query.id1);
        let id2 = canonical_id(&query.id2);
        let prefix = ersa_dir_for(&self.match_file)
            .join(format!("output_new_{id1}_{id2}"))
            .to_string_lossy()
            .into_owned();

        let options = EstimatorOptions::single_pair(
            key.to_string(),
            segment_dict,
            self.match_file.clone(),
            &prefix,
            self.index.is_annotated(),
        );
        let rows = self.estimator.run(options).await?.into_rows();
        if rows.is_empty() {
            debug!("Estimator returned no rows for {}, returning prior", key);
            return Ok(query.prior.clone());
        }

        match RelatednessProportions::from_rows(&rows) {
            Some(proportions) => {
                let response = prior.blend(&proportions);
                debug!("{} -> {}", key, response);
                Ok(response.to_string())
            }
            None => {
                debug!("No likelihood mass in degrees 2-40 for {}, returning prior", key);
                Ok(query.prior.clone())
            }
        }
    }
}

async fn write_reply(stream: &mut TcpStream, body: &str) -> std::io::Result<()> {
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}
