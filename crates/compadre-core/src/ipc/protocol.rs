//! Request wire format.
//!
//! Each connection carries one UTF-8 message of at most
//! [`ProtocolConfig::MAX_MESSAGE_SIZE`] bytes and receives one reply, framed
//! only by the server closing the connection.
//!
//! ```text
//! close                               stop the server
//! ...|padre|...                       full-population estimator run
//! id1|id2|p0,p1,...|analysis_type     single-pair relatedness query
//! ```

use crate::config::ProtocolConfig;
use crate::segments::PairKey;
use crate::{CompadreError, Result};
use tokio::io::AsyncReadExt;

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Close,
    Bulk,
    Pairwise(PairwiseQuery),
}

/// Fields of a single-pair query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseQuery {
    pub id1: String,
    pub id2: String,
    /// Prior vector exactly as sent; echoed back unchanged on a miss.
    pub prior: String,
    /// Carried for the caller's bookkeeping, not used in the computation.
    pub analysis_type: String,
}

impl PairwiseQuery {
    /// Index key built from the ids after their final underscore.
    pub fn pair_key(&self) -> PairKey {
        PairKey::from_composite(&self.id1, &self.id2)
    }
}

impl Request {
    pub fn parse(message: &str) -> Result<Self> {
        let message = message.trim();
        if message == ProtocolConfig::CLOSE_MESSAGE {
            return Ok(Request::Close);
        }

        let fields: Vec<&str> = message.split(ProtocolConfig::FIELD_SEPARATOR).collect();
        if fields.contains(&ProtocolConfig::BULK_MARKER) {
            return Ok(Request::Bulk);
        }

        match fields.as_slice() {
            [id1, id2, prior, analysis_type] => Ok(Request::Pairwise(PairwiseQuery {
                id1: id1.to_string(),
                id2: id2.to_string(),
                prior: prior.to_string(),
                analysis_type: analysis_type.to_string(),
            })),
            _ => Err(CompadreError::malformed(
                "fields",
                format!(
                    "expected {} '|'-separated fields, got {}",
                    ProtocolConfig::PAIRWISE_FIELDS,
                    fields.len()
                ),
            )),
        }
    }
}

/// Read one request message with a single bounded read.
///
/// Returns `None` when the peer closed without sending anything.
pub async fn read_message<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = vec![0u8; ProtocolConfig::MAX_MESSAGE_SIZE];
    let n = reader.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| CompadreError::malformed("payload", "invalid UTF-8 in request"))
}

/// Reply body for a failed request.
pub fn error_reply(err: &CompadreError) -> String {
    format!("{}{}", ProtocolConfig::ERROR_PREFIX, err)
}
