//! Error types for lossy-mpi

use thiserror::Error;

/// Result type for pool and transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pool and transport operations.
///
/// Peer timeouts are deliberately absent: a silent peer is resolved locally by
/// substituting the caller's fallback value, never reported as an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid rank specified (out of `[0, size)`)
    #[error("Invalid rank {rank} for group of size {size}")]
    InvalidRank {
        /// The offending rank
        rank: usize,
        /// Size of the group
        size: usize,
    },

    /// Invalid construction or call configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown transfer mode name
    #[error("Invalid transfer mode: {0:?}")]
    InvalidTransferMode(String),

    /// Buffer length does not match what the operation requires
    #[error("Invalid buffer: expected {expected} elements, got {actual}")]
    InvalidBuffer {
        /// Required number of elements
        expected: usize,
        /// Number of elements provided
        actual: usize,
    },

    /// A received payload could not be interpreted for the requested layout
    #[error("Malformed payload from rank {peer}: {reason}")]
    MalformedPayload {
        /// Rank the payload came from
        peer: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Error raised by the underlying point-to-point transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Payload serialization failed
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Payload deserialization failed
    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

impl Error {
    /// Check that `rank` lies in `[0, size)`.
    pub fn check_rank(rank: usize, size: usize) -> Result<()> {
        if rank < size {
            Ok(())
        } else {
            Err(Error::InvalidRank { rank, size })
        }
    }

    /// Check that a buffer holds exactly `expected` elements.
    pub fn check_len(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::InvalidBuffer { expected, actual })
        }
    }
}
