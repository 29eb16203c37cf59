//! The transport boundary: something that hands us raw event records, one
//! at a time.

use std::time::Duration;

use thiserror::Error;

/// Outcome of a single poll of the transport.
#[derive(Debug)]
pub enum Poll {
    /// A raw record was delivered.
    Record(Vec<u8>),
    /// Nothing available right now; retry.
    Empty,
}

/// Fatal transport faults. Anything returned here ends the ingestion loop.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("event transport closed")]
    Closed,

    #[error("event transport failed: {0}")]
    Failed(String),
}

/// Source of raw event records.
///
/// `poll` blocks for at most `timeout` so the caller can observe its
/// shutdown flag between records.
pub trait Transport {
    fn poll(&mut self, timeout: Duration) -> Result<Poll, TransportError>;
}
