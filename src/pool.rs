//! Membership-masked collectives that keep making progress when ranks go
//! silent.
//!
//! A [`Pool`] wraps one rank's [`Channel`] and offers gather, broadcast and
//! barrier rounds coordinated by a root rank. Root skips every peer its
//! [`Mask`] marks dead, and substitutes a caller-supplied fallback for any
//! live peer that does not answer within the timeout budget. No round blocks
//! the group for longer than the budget times the number of peers contacted.
//!
//! # Example
//!
//! ```
//! use lossy_mpi::local::LocalGroup;
//! use lossy_mpi::Pool;
//! use std::thread;
//! use std::time::Duration;
//!
//! let (_, channels) = LocalGroup::new(3);
//! let results: Vec<_> = thread::scope(|s| {
//!     let handles: Vec<_> = channels
//!         .into_iter()
//!         .map(|ch| {
//!             s.spawn(move || {
//!                 let mut pool = Pool::new(ch, 0, Duration::from_secs(2), 20)?;
//!                 pool.ready();
//!                 pool.sync_mask()?;
//!                 let rank = pool.rank() as i32;
//!                 pool.gather(Some(10 + rank), None)
//!             })
//!         })
//!         .collect();
//!     handles.into_iter().map(|h| h.join().unwrap()).collect()
//! });
//! assert_eq!(results[0].as_ref().unwrap(), &vec![Some(10), Some(11), Some(12)]);
//! # Ok::<(), lossy_mpi::Error>(())
//! ```

use crate::channel::{Channel, RoundKind, Tag};
use crate::config::{PoolConfig, TimeoutPolicy};
use crate::datatype::{decode_into, encode_slice, Datatype};
use crate::error::{Error, Result};
use crate::mask::{self, Mask};
use crate::multiplexer::RequestMultiplexer;
use crate::status::{Signal, Status};
use crate::transfer::{self, TransferMode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Encoding used by one call of the transaction engine.
trait Codec {
    type Value: Clone;

    fn mode(&self) -> TransferMode;
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>>;
    fn decode(&self, source: usize, bytes: Vec<u8>) -> Result<Self::Value>;
}

/// Fixed-length slices of `E`.
struct TypedCodec<E> {
    len: usize,
    _marker: PhantomData<E>,
}

impl<E: Datatype> TypedCodec<E> {
    fn new(len: usize) -> Self {
        TypedCodec {
            len,
            _marker: PhantomData,
        }
    }
}

impl<E: Datatype> Codec for TypedCodec<E> {
    type Value = Vec<E>;

    fn mode(&self) -> TransferMode {
        TransferMode::Typed
    }

    fn encode(&self, value: &Vec<E>) -> Result<Vec<u8>> {
        Ok(encode_slice(value))
    }

    fn decode(&self, source: usize, bytes: Vec<u8>) -> Result<Vec<E>> {
        let mut out = vec![E::default(); self.len];
        decode_into(&bytes, &mut out, source)?;
        Ok(out)
    }
}

/// Any serde value.
struct GenericCodec<T>(PhantomData<T>);

impl<T> GenericCodec<T> {
    fn new() -> Self {
        GenericCodec(PhantomData)
    }
}

impl<T: Serialize + DeserializeOwned + Clone> Codec for GenericCodec<T> {
    type Value = T;

    fn mode(&self) -> TransferMode {
        TransferMode::Generic
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        transfer::encode(value)
    }

    fn decode(&self, source: usize, bytes: Vec<u8>) -> Result<T> {
        transfer::decode(source, &bytes)
    }
}

/// A fixed group of ranks running fault-tolerant collectives.
///
/// Every live rank must call the same sequence of collectives; each call is
/// one transaction, and transactions are told apart on the wire by tag. A
/// rank whose mask entry at root is dead is expected to have left its loop
/// and must not call further collectives.
pub struct Pool<C: Channel> {
    comm: RequestMultiplexer<C>,
    size: usize,
    rank: usize,
    root: usize,
    status: Status,
    mask: Mask,
    transaction: u64,
}

impl<C: Channel> Pool<C> {
    /// Create a pool over `channel`, coordinated by `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a rank of the group or `n_tries` is
    /// zero.
    pub fn new(channel: C, root: usize, timeout: Duration, n_tries: u32) -> Result<Self> {
        Self::with_config(channel, PoolConfig::new(root, timeout, n_tries))
    }

    /// Create a pool from a [`PoolConfig`].
    pub fn with_config(channel: C, config: PoolConfig) -> Result<Self> {
        let size = channel.size();
        let rank = channel.rank();
        let policy = config.validate(size)?;
        Error::check_rank(rank, size)?;

        debug!(rank, size, root = config.root, "creating pool");
        Ok(Pool {
            comm: RequestMultiplexer::new(channel, policy),
            size,
            rank,
            root: config.root,
            status: Status::Uninit,
            mask: Mask::new(size),
            transaction: 0,
        })
    }

    /// Rank of the calling process.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks in the group.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The coordinating rank.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Whether the calling process is root.
    pub fn is_root(&self) -> bool {
        self.rank == self.root
    }

    /// This rank's own lifecycle state.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Last observed status of every rank. Only current at root.
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Non-root ranks not dead in the local mask, ascending.
    pub fn live_ranks(&self) -> Vec<usize> {
        self.mask.live_peers(self.root).collect()
    }

    /// Timeout budget applied to every pending request.
    pub fn policy(&self) -> TimeoutPolicy {
        self.comm.policy()
    }

    /// Number of collective transactions started so far.
    pub fn transaction(&self) -> u64 {
        self.transaction
    }

    /// Skip the transaction counter ahead by `n`. Every rank must do the same.
    pub fn advance_transaction_counter(&mut self, n: u64) {
        self.transaction += n;
    }

    /// Declare this rank ready to contribute data. No effect once done.
    pub fn ready(&mut self) {
        mask::ready(&mut self.status);
    }

    /// Drop this rank from the pool. Terminal.
    #[allow(clippy::should_implement_trait)]
    pub fn drop(&mut self) {
        debug!(rank = self.rank, "dropping out of pool");
        mask::drop_out(&mut self.status);
    }

    /// At root: `true` once no non-root rank is `Ready` in the mask.
    ///
    /// Always `false` on other ranks; branch on [`is_root`](Self::is_root)
    /// first.
    pub fn done(&self) -> bool {
        self.is_root() && !self.mask.any_ready_peer(self.root)
    }

    fn next_tag(&mut self, kind: RoundKind) -> Tag {
        let tag = kind.tag(self.transaction);
        self.transaction += 1;
        tag
    }

    /// Masked gather of `send` to root.
    ///
    /// Root stores its own value without a message, receives from every live
    /// peer and passes each resolved value (or `fallback`) to `store`. Dead
    /// peers are neither contacted nor stored.
    fn gather_transaction<X: Codec>(
        &mut self,
        kind: RoundKind,
        codec: &X,
        send: X::Value,
        fallback: X::Value,
        mut store: impl FnMut(usize, X::Value),
    ) -> Result<()> {
        let tag = self.next_tag(kind);
        trace!(
            rank = self.rank,
            ?kind,
            mode = %codec.mode(),
            tag,
            "starting gather transaction"
        );

        if self.is_root() {
            store(self.root, send);
            for i in 0..self.size {
                if i == self.root {
                    continue;
                }
                if self.mask.is_dead(i) {
                    trace!(rank = self.rank, peer = i, status = %self.mask[i], "skipping dead rank");
                    continue;
                }
                self.comm.receive(i, kind, tag)?;
            }
        } else {
            let payload = codec.encode(&send)?;
            self.comm.send(payload, self.root, kind, tag)?;
        }

        let results = self
            .comm
            .collect_pending(fallback, |source, bytes| codec.decode(source, bytes))?;

        if self.is_root() {
            for (i, value) in results {
                store(i, value);
            }
        }
        Ok(())
    }

    /// Masked broadcast of root's `send`. Returns root's value at root and
    /// the received value (or `fallback`) elsewhere.
    fn bcast_transaction<X: Codec>(
        &mut self,
        kind: RoundKind,
        codec: &X,
        send: X::Value,
        fallback: X::Value,
    ) -> Result<X::Value> {
        let tag = self.next_tag(kind);
        trace!(
            rank = self.rank,
            ?kind,
            mode = %codec.mode(),
            tag,
            "starting bcast transaction"
        );

        if self.is_root() {
            let payload = codec.encode(&send)?;
            for i in 0..self.size {
                if i == self.root {
                    continue;
                }
                if self.mask.is_dead(i) {
                    trace!(rank = self.rank, peer = i, status = %self.mask[i], "skipping dead rank");
                    continue;
                }
                self.comm.send(payload.clone(), i, kind, tag)?;
            }
            self.comm
                .collect_pending(fallback, |source, bytes| codec.decode(source, bytes))?;
            Ok(send)
        } else {
            self.comm.receive(self.root, kind, tag)?;
            let mut results = self
                .comm
                .collect_pending(fallback.clone(), |source, bytes| codec.decode(source, bytes))?;
            Ok(results.remove(&self.root).unwrap_or(fallback))
        }
    }

    /// Refresh root's mask with every live rank's own status.
    ///
    /// Ranks that do not answer in time are stamped `Timeout` and, like
    /// `Done` ranks, are never contacted again. The refreshed mask is not sent
    /// back out: other ranks keep their stale copy.
    pub fn sync_mask(&mut self) -> Result<()> {
        let mut observed = Vec::with_capacity(self.size);
        self.gather_transaction(
            RoundKind::MaskSync,
            &GenericCodec::<Status>::new(),
            self.status,
            Status::Timeout,
            |i, status| observed.push((i, status)),
        )?;

        for (i, status) in observed {
            if status == Status::Timeout && i != self.root {
                warn!(rank = self.rank, peer = i, "rank timed out during mask sync");
            }
            self.mask.record(i, status);
        }
        if self.is_root() {
            debug!(rank = self.rank, mask = ?self.mask.as_slice(), "mask synchronized");
        }
        Ok(())
    }

    /// Gather one value per rank to root.
    ///
    /// Returns a vector of length `size` pre-filled with `fallback`. At root,
    /// slot `i` holds what rank `i` sent this round, or `fallback` if `i` is
    /// dead or timed out. Other ranks get the untouched fallback vector.
    pub fn gather<T>(&mut self, value: T, fallback: T) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        self.gather_generic(RoundKind::Gather, value, fallback)
    }

    fn gather_generic<T>(&mut self, kind: RoundKind, value: T, fallback: T) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let mut out = vec![fallback.clone(); self.size];
        self.gather_transaction(kind, &GenericCodec::new(), value, fallback, |i, v| {
            out[i] = v;
        })?;
        Ok(out)
    }

    /// Gather fixed-length buffers to root, in place.
    ///
    /// At root `recv` must hold `send.len() * size` elements; the chunk for
    /// rank `i` starts at `i * send.len()`. Chunks of live peers that time out
    /// are filled with `fallback`; chunks of dead peers are left untouched.
    /// `recv` is ignored on other ranks.
    pub fn gather_buffer<E: Datatype>(
        &mut self,
        send: &[E],
        recv: &mut [E],
        fallback: E,
    ) -> Result<()> {
        let n = send.len();
        if self.is_root() {
            Error::check_len(n * self.size, recv.len())?;
        }
        self.gather_transaction(
            RoundKind::Gather,
            &TypedCodec::new(n),
            send.to_vec(),
            vec![fallback; n],
            |i, chunk| recv[i * n..(i + 1) * n].copy_from_slice(&chunk),
        )
    }

    /// Broadcast root's `value` to every live rank.
    ///
    /// Root gets its own value back. Other ranks get root's value, or
    /// `fallback` if it did not arrive in time; their `value` is ignored.
    pub fn bcast<T>(&mut self, value: T, fallback: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        self.bcast_transaction(RoundKind::Bcast, &GenericCodec::new(), value, fallback)
    }

    /// Broadcast root's `buf` into every live rank's `buf`, in place.
    ///
    /// A rank that does not hear from root in time gets `buf` filled with
    /// `fallback`.
    pub fn bcast_buffer<E: Datatype>(&mut self, buf: &mut [E], fallback: E) -> Result<()> {
        let n = buf.len();
        let received = self.bcast_transaction(
            RoundKind::Bcast,
            &TypedCodec::new(n),
            buf.to_vec(),
            vec![fallback; n],
        )?;
        buf.copy_from_slice(&received);
        Ok(())
    }

    /// Soft barrier: every live rank reports in to root.
    ///
    /// Always returns once each contacted rank has answered or used up its
    /// timeout budget. Silent ranks are logged, never reported as errors.
    pub fn barrier(&mut self) -> Result<()> {
        let mut silent = Vec::new();
        self.gather_transaction(
            RoundKind::Barrier,
            &GenericCodec::<Signal>::new(),
            Signal::Ok,
            Signal::Timeout,
            |i, signal| {
                if signal == Signal::Timeout {
                    silent.push(i);
                }
            },
        )?;
        if !silent.is_empty() {
            warn!(rank = self.rank, ?silent, "barrier completed without some ranks");
        }
        Ok(())
    }
}
