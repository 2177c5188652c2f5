//! Membership bookkeeping: the local rank's own lifecycle and root's view of
//! every peer.

use crate::status::Status;
use std::ops::Index;

/// Root's record of each rank's last observed [`Status`], indexed by rank.
///
/// The length always equals the group size. Only root's copy is kept current;
/// other ranks hold a mask that is never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    slots: Vec<Status>,
}

impl Mask {
    /// Create a mask for `size` ranks, all `Uninit`.
    pub fn new(size: usize) -> Self {
        Mask {
            slots: vec![Status::Uninit; size],
        }
    }

    /// Number of ranks covered.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false` for a mask built from a real group.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `rank` is excluded from masked rounds.
    pub fn is_dead(&self, rank: usize) -> bool {
        self.slots[rank].is_dead()
    }

    /// View the mask as a slice.
    pub fn as_slice(&self) -> &[Status] {
        &self.slots
    }

    /// Record `status` for `rank`.
    ///
    /// A dead slot stays dead: once a peer is excluded it is never contacted
    /// again, so nothing could legitimately revive it.
    pub(crate) fn record(&mut self, rank: usize, status: Status) {
        let slot = &mut self.slots[rank];
        if !slot.is_dead() {
            *slot = status;
        }
    }

    /// Ranks other than `root` that are not dead, in ascending order.
    pub fn live_peers(&self, root: usize) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |&(i, s)| i != root && !s.is_dead())
            .map(|(i, _)| i)
    }

    /// Whether any rank other than `root` is still `Ready`.
    pub fn any_ready_peer(&self, root: usize) -> bool {
        self.slots
            .iter()
            .enumerate()
            .any(|(i, s)| i != root && s.is_ready())
    }
}

impl Index<usize> for Mask {
    type Output = Status;

    fn index(&self, rank: usize) -> &Status {
        &self.slots[rank]
    }
}

impl PartialEq<[Status]> for Mask {
    fn eq(&self, other: &[Status]) -> bool {
        self.slots == other
    }
}

impl<const N: usize> PartialEq<[Status; N]> for Mask {
    fn eq(&self, other: &[Status; N]) -> bool {
        self.slots == other
    }
}

/// Advance the local lifecycle to `Ready`. No effect once `Done`.
pub(crate) fn ready(status: &mut Status) {
    if matches!(*status, Status::Uninit | Status::Ready) {
        *status = Status::Ready;
    }
}

/// Move the local lifecycle to its terminal `Done` state.
pub(crate) fn drop_out(status: &mut Status) {
    *status = Status::Done;
}
