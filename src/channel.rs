//! The point-to-point transport consumed by the pool.
//!
//! A [`Channel`] is one rank's view of a fixed-size group: it knows its own
//! rank and the group size, and it can start nonblocking sends and receives
//! that hand back a [`Request`]. The pool never blocks on a receive; it only
//! polls requests with [`Request::test`].
//!
//! Messages are matched on `(source, tag)`. Tags are built from a
//! [`RoundKind`] and the pool's transaction counter, see [`RoundKind::tag`].

use crate::error::Result;
use crate::request::Request;

/// Message tag as understood by the transport.
pub type Tag = i32;

/// Number of distinct transactions before tags wrap around.
pub const TAG_WINDOW: u64 = 4096;

/// Spacing between consecutive transactions in tag space.
const TAG_STRIDE: i32 = 8;

/// One rank's handle on a group of cooperating processes.
pub trait Channel {
    /// Request handle returned by nonblocking operations.
    type Request: Request;

    /// Get the number of processes in the group.
    fn size(&self) -> usize;

    /// Get the rank of the calling process in the group.
    fn rank(&self) -> usize;

    /// Start a nonblocking send of `payload` to `dest`.
    fn isend(&self, payload: Vec<u8>, dest: usize, tag: Tag) -> Result<Self::Request>;

    /// Start a nonblocking receive of the next message from `source` with `tag`.
    fn irecv(&self, source: usize, tag: Tag) -> Result<Self::Request>;
}

/// Kinds of collective rounds. Each kind gets its own slot in tag space so
/// that rounds of different kinds never match each other's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RoundKind {
    /// Gather of every rank's own [`Status`](crate::Status) into root's mask
    MaskSync = 1,
    /// Masked data gather to root
    Gather = 2,
    /// Masked broadcast from root
    Bcast = 3,
    /// Soft barrier
    Barrier = 4,
}

impl RoundKind {
    /// Wire tag for this kind of round in transaction `transaction`.
    ///
    /// Stays below 32767, the smallest tag upper bound an MPI implementation
    /// may advertise.
    pub fn tag(self, transaction: u64) -> Tag {
        ((transaction % TAG_WINDOW) as i32) * TAG_STRIDE + self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_do_not_collide_within_a_transaction() {
        let tags = [
            RoundKind::MaskSync.tag(5),
            RoundKind::Gather.tag(5),
            RoundKind::Bcast.tag(5),
            RoundKind::Barrier.tag(5),
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn consecutive_transactions_get_distinct_tags() {
        assert_ne!(RoundKind::Gather.tag(0), RoundKind::Gather.tag(1));
        assert_eq!(RoundKind::Gather.tag(0), RoundKind::Gather.tag(TAG_WINDOW));
    }

    #[test]
    fn tags_stay_below_mpi_minimum_upper_bound() {
        assert!(RoundKind::Barrier.tag(TAG_WINDOW - 1) <= 32767);
        assert!(RoundKind::MaskSync.tag(0) > 0);
    }
}
