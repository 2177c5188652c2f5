//! Rank liveness states.
//!
//! Every rank carries its own [`Status`], and root additionally keeps a
//! [`Mask`](crate::Mask) of the last status it observed for each peer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness of a rank.
///
/// A rank moves `Uninit → Ready → Done` on its own. `Timeout` is never
/// self-reported: it is root's record that a peer failed to answer a
/// mask-sync round in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Has data to contribute
    Ready,
    /// Left the pool voluntarily; terminal
    Done,
    /// Not yet declared ready
    #[default]
    Uninit,
    /// Observed silent by root during a mask sync
    Timeout,
}

impl Status {
    /// Return `true` if status is `Done` or `Timeout`.
    ///
    /// Dead ranks are skipped by every masked round for the rest of the
    /// pool's lifetime.
    pub fn is_dead(self) -> bool {
        matches!(self, Status::Done | Status::Timeout)
    }

    /// Return `true` if status is `Ready`.
    pub fn is_ready(self) -> bool {
        self == Status::Ready
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ready => "READY",
            Status::Done => "DONE",
            Status::Uninit => "UNINIT",
            Status::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}

/// Per-rank contribution to a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// The rank reached the barrier
    Ok,
    /// Fallback for a rank that did not answer in time
    Timeout,
}
