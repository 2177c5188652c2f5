//! In-process transport for running a whole group inside one process.
//!
//! [`LocalGroup::new`] creates one [`LocalChannel`] per rank; move each one
//! into its own thread and build a [`Pool`](crate::Pool) on it. Sends are
//! buffered and complete immediately. Receives match messages first-in,
//! first-out per `(source, dest, tag)`.
//!
//! A rank can be muted with [`LocalGroup::mute`]: from then on its messages
//! are silently discarded, which is how tests simulate a peer that stopped
//! responding.
//!
//! Nothing is ever cancelled. A message whose receive was abandoned (a reply
//! that arrived after its round gave up on it) stays queued under its tag for
//! the life of the group; a later round uses a different tag and never takes
//! it. [`LocalGroup::queued_for`] counts such leftovers.
//!
//! # Example
//!
//! ```
//! use lossy_mpi::local::LocalGroup;
//! use lossy_mpi::Channel;
//!
//! let (group, channels) = LocalGroup::new(3);
//! assert_eq!(group.size(), 3);
//! assert_eq!(channels[2].rank(), 2);
//! ```

use crate::channel::{Channel, Tag};
use crate::error::{Error, Result};
use crate::request::{Completion, Request};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

type Key = (usize, usize, Tag);

#[derive(Default)]
struct Mailboxes {
    queues: HashMap<Key, VecDeque<Vec<u8>>>,
    muted: HashSet<usize>,
}

struct Shared {
    size: usize,
    state: Mutex<Mailboxes>,
    arrived: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, Mailboxes>> {
        self.state
            .lock()
            .map_err(|_| Error::Transport("local mailbox poisoned".into()))
    }
}

/// Control handle over a set of [`LocalChannel`]s.
#[derive(Clone)]
pub struct LocalGroup {
    shared: Arc<Shared>,
}

impl LocalGroup {
    /// Create a group of `size` ranks and one channel per rank, in rank order.
    pub fn new(size: usize) -> (LocalGroup, Vec<LocalChannel>) {
        let shared = Arc::new(Shared {
            size,
            state: Mutex::new(Mailboxes::default()),
            arrived: Condvar::new(),
        });
        let channels = (0..size)
            .map(|rank| LocalChannel {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect();
        (LocalGroup { shared }, channels)
    }

    /// Number of ranks.
    pub fn size(&self) -> usize {
        self.shared.size
    }

    /// Discard every message `rank` sends from now on, and anything it has
    /// already sent that is still undelivered.
    pub fn mute(&self, rank: usize) -> Result<()> {
        Error::check_rank(rank, self.shared.size)?;
        let mut state = self.shared.lock()?;
        state.muted.insert(rank);
        state.queues.retain(|&(source, _, _), _| source != rank);
        Ok(())
    }

    /// Number of delivered but not yet received messages addressed to `dest`,
    /// including late replies that no receive will ever match.
    pub fn queued_for(&self, dest: usize) -> Result<usize> {
        let state = self.shared.lock()?;
        Ok(state
            .queues
            .iter()
            .filter(|((_, d, _), _)| *d == dest)
            .map(|(_, q)| q.len())
            .sum())
    }
}

/// One rank's endpoint in a [`LocalGroup`].
pub struct LocalChannel {
    rank: usize,
    shared: Arc<Shared>,
}

impl Channel for LocalChannel {
    type Request = LocalRequest;

    fn size(&self) -> usize {
        self.shared.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn isend(&self, payload: Vec<u8>, dest: usize, tag: Tag) -> Result<LocalRequest> {
        Error::check_rank(dest, self.shared.size)?;
        let mut state = self.shared.lock()?;
        if !state.muted.contains(&self.rank) {
            state
                .queues
                .entry((self.rank, dest, tag))
                .or_default()
                .push_back(payload);
            self.shared.arrived.notify_all();
        }
        Ok(LocalRequest::sent())
    }

    fn irecv(&self, source: usize, tag: Tag) -> Result<LocalRequest> {
        Error::check_rank(source, self.shared.size)?;
        Ok(LocalRequest::receive(
            (source, self.rank, tag),
            Arc::clone(&self.shared),
        ))
    }
}

/// Request handle of a [`LocalChannel`].
pub struct LocalRequest {
    inner: Pending,
}

enum Pending {
    /// Buffered send; always complete.
    Sent,
    /// Receive waiting for a message on `(source, dest, tag)`.
    Receive { key: Key, shared: Arc<Shared> },
}

impl LocalRequest {
    fn sent() -> Self {
        LocalRequest {
            inner: Pending::Sent,
        }
    }

    fn receive(key: Key, shared: Arc<Shared>) -> Self {
        LocalRequest {
            inner: Pending::Receive { key, shared },
        }
    }

    fn take(state: &mut Mailboxes, key: &Key) -> Option<Vec<u8>> {
        let queue = state.queues.get_mut(key)?;
        let msg = queue.pop_front();
        if queue.is_empty() {
            state.queues.remove(key);
        }
        msg
    }
}

impl Request for LocalRequest {
    fn test(&mut self) -> Result<Option<Completion>> {
        match &self.inner {
            Pending::Sent => Ok(Some(Completion::Sent)),
            Pending::Receive { key, shared } => {
                let mut state = shared.lock()?;
                Ok(Self::take(&mut state, key).map(Completion::Received))
            }
        }
    }

    fn wait(self) -> Result<Completion> {
        match self.inner {
            Pending::Sent => Ok(Completion::Sent),
            Pending::Receive { key, shared } => {
                let mut state = shared.lock()?;
                loop {
                    if let Some(msg) = Self::take(&mut state, &key) {
                        return Ok(Completion::Received(msg));
                    }
                    state = shared
                        .arrived
                        .wait(state)
                        .map_err(|_| Error::Transport("local mailbox poisoned".into()))?;
                }
            }
        }
    }
}
