//! Request handles for nonblocking point-to-point operations.

use crate::error::Result;

/// How a nonblocking operation finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A send was acknowledged by the transport. Carries no payload.
    Sent,
    /// A receive matched a message; carries the raw payload.
    Received(Vec<u8>),
}

impl Completion {
    /// Consume the completion, returning the payload of a receive.
    pub fn into_payload(self) -> Option<Vec<u8>> {
        match self {
            Completion::Sent => None,
            Completion::Received(bytes) => Some(bytes),
        }
    }
}

/// A handle to an in-flight nonblocking operation.
///
/// Dropping a request that has not completed abandons it: the transport
/// decides what becomes of a message that later matches it. Nothing in this
/// crate cancels requests.
pub trait Request {
    /// Test if this operation has completed without blocking.
    ///
    /// Returns `Ok(None)` while the operation is still in flight. Once a
    /// completion has been returned the request must not be tested again.
    fn test(&mut self) -> Result<Option<Completion>>;

    /// Block until this operation completes.
    fn wait(self) -> Result<Completion>;
}

/// Direction of a registered request, kept alongside it so that completion
/// handling can tell sends and receives apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Outgoing message
    Send,
    /// Incoming message
    Receive,
}
