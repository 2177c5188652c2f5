//! Timeout-bounded resolution of batches of nonblocking requests.
//!
//! A [`RequestMultiplexer`] owns the rank's [`Channel`] and collects requests
//! registered during a round. [`collect_pending`](RequestMultiplexer::collect_pending)
//! polls them one after the other, each with its own full retry budget, and
//! substitutes a fallback for anything that stays silent. Worst-case latency of
//! a collection is therefore the number of pending requests times the timeout.
//!
//! Sends that were not acknowledged within their budget are parked, one per
//! destination and round kind, and waited on before the next send of that kind
//! to that destination is issued.

use crate::channel::{Channel, RoundKind, Tag};
use crate::config::TimeoutPolicy;
use crate::error::Result;
use crate::request::{Completion, Direction, Request};
use std::collections::{BTreeMap, HashMap};
use std::thread;
use tracing::{debug, trace, warn};

/// Resolved values of one collection, keyed by logical index.
pub type ResultMap<T> = BTreeMap<usize, T>;

/// A request registered between initiating a round and collecting it.
struct PendingRequest<R> {
    index: usize,
    kind: RoundKind,
    direction: Direction,
    request: R,
}

/// Wraps a [`Channel`] with a shared timeout budget.
pub struct RequestMultiplexer<C: Channel> {
    channel: C,
    policy: TimeoutPolicy,
    pending: Vec<PendingRequest<C::Request>>,
    outstanding: HashMap<(usize, RoundKind), C::Request>,
}

impl<C: Channel> RequestMultiplexer<C> {
    /// Wrap `channel` with `policy`.
    pub fn new(channel: C, policy: TimeoutPolicy) -> Self {
        debug!(
            rank = channel.rank(),
            timeout = ?policy.timeout(),
            n_tries = policy.n_tries(),
            "initialized request multiplexer"
        );
        RequestMultiplexer {
            channel,
            policy,
            pending: Vec::new(),
            outstanding: HashMap::new(),
        }
    }

    /// The wrapped channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// The timeout policy.
    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// Number of requests registered since the last collection.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of parked, unacknowledged sends.
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    fn rank(&self) -> usize {
        self.channel.rank()
    }

    /// Register a receive request under `index`. No I/O happens here.
    pub fn register_pending(&mut self, index: usize, kind: RoundKind, request: C::Request) {
        trace!(rank = self.rank(), index, ?kind, "registering receive");
        self.pending.push(PendingRequest {
            index,
            kind,
            direction: Direction::Receive,
            request,
        });
    }

    /// Register a send request under `index`, the destination rank.
    pub fn register_send(&mut self, index: usize, kind: RoundKind, request: C::Request) {
        trace!(rank = self.rank(), index, ?kind, "registering send");
        self.pending.push(PendingRequest {
            index,
            kind,
            direction: Direction::Send,
            request,
        });
    }

    /// Block until the previous unacknowledged send of `kind` to `dest`, if
    /// any, has completed.
    pub fn ensure_last_send_complete(&mut self, dest: usize, kind: RoundKind) -> Result<()> {
        if let Some(request) = self.outstanding.remove(&(dest, kind)) {
            debug!(rank = self.rank(), dest, ?kind, "waiting on previous send");
            request.wait()?;
        }
        Ok(())
    }

    /// Start a send of `payload` to `dest`, after the previous one of the same
    /// kind has drained, and register it under `dest`.
    pub fn send(&mut self, payload: Vec<u8>, dest: usize, kind: RoundKind, tag: Tag) -> Result<()> {
        self.ensure_last_send_complete(dest, kind)?;
        let request = self.channel.isend(payload, dest, tag)?;
        self.register_send(dest, kind, request);
        Ok(())
    }

    /// Start a receive from `source` and register it under `source`.
    pub fn receive(&mut self, source: usize, kind: RoundKind, tag: Tag) -> Result<()> {
        let request = self.channel.irecv(source, tag)?;
        self.register_pending(source, kind, request);
        Ok(())
    }

    /// Resolve every pending request, in registration order.
    ///
    /// Each index starts out as `fallback`. A request is tested up to
    /// `n_tries` times with `timeout / n_tries` of sleep between failed
    /// tests; the first completed receive is passed through `decode` and
    /// replaces the fallback. Completed sends leave the fallback in place.
    /// Requests that never complete are abandoned, not cancelled. The
    /// pending list is empty afterwards, even on error.
    pub fn collect_pending<T, F>(&mut self, fallback: T, mut decode: F) -> Result<ResultMap<T>>
    where
        T: Clone,
        F: FnMut(usize, Vec<u8>) -> Result<T>,
    {
        let rank = self.rank();
        let pending = std::mem::take(&mut self.pending);
        debug!(rank, count = pending.len(), "collecting pending requests");

        let mut results = ResultMap::new();
        for PendingRequest {
            index,
            kind,
            direction,
            mut request,
        } in pending
        {
            results.insert(index, fallback.clone());

            match self.poll(index, &mut request)? {
                Some(done) => {
                    if let Some(bytes) = done.into_payload() {
                        results.insert(index, decode(index, bytes)?);
                    }
                }
                None if direction == Direction::Send => {
                    warn!(rank, index, ?kind, "send unacknowledged, parking it");
                    self.outstanding.insert((index, kind), request);
                }
                None => {
                    warn!(rank, index, ?kind, "request timed out, using fallback");
                }
            }
        }
        Ok(results)
    }

    /// Test `request` up to `n_tries` times. `None` means the budget ran out.
    fn poll(&self, index: usize, request: &mut C::Request) -> Result<Option<Completion>> {
        let n_tries = self.policy.n_tries();
        for attempt in 1..=n_tries {
            if let Some(done) = request.test()? {
                trace!(rank = self.rank(), index, attempt, "request completed");
                return Ok(Some(done));
            }
            if attempt < n_tries {
                trace!(rank = self.rank(), index, attempt, "sleeping before next test");
                thread::sleep(self.policy.interval());
            }
        }
        Ok(None)
    }

    /// Drop every parked send without waiting on it. Returns how many were
    /// abandoned. What happens to those messages is up to the transport.
    pub fn abandon_outstanding(&mut self) -> usize {
        let n = self.outstanding.len();
        if n > 0 {
            debug!(rank = self.rank(), count = n, "abandoning unacknowledged sends");
        }
        self.outstanding.clear();
        n
    }
}

impl<C: Channel> Drop for RequestMultiplexer<C> {
    fn drop(&mut self) {
        self.abandon_outstanding();
    }
}
