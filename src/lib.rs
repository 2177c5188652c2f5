//! # lossy-mpi
//!
//! Fault-tolerant collectives over nonblocking point-to-point channels.
//!
//! Classical collectives block until every rank takes part. The collectives in
//! this crate are coordinated by a root rank that keeps a membership mask of
//! its peers and gives every pending request a bounded timeout budget:
//!
//! - Ranks that left the pool (`Done`) or went silent (`Timeout`) are skipped
//!   by every later round, permanently.
//! - A live rank that does not answer in time gets a caller-supplied fallback
//!   value in its slot instead of hanging the round.
//! - The barrier is soft: it always returns, and only logs missing ranks.
//!
//! The transport is pluggable through the [`Channel`] trait. An in-process
//! implementation lives in [`local`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use lossy_mpi::{Channel, Pool, Status};
//! use std::time::Duration;
//!
//! fn run<C: Channel>(channel: C, mut work: Vec<u64>) -> Result<(), lossy_mpi::Error> {
//!     let mut pool = Pool::new(channel, 0, Duration::from_secs(2), 10)?;
//!     pool.ready();
//!     loop {
//!         if work.is_empty() {
//!             pool.drop();
//!         }
//!         pool.sync_mask()?;
//!         if pool.is_root() {
//!             if pool.done() {
//!                 break;
//!             }
//!         } else if pool.status() == Status::Done {
//!             break;
//!         }
//!         let all = pool.gather(work.pop(), None)?;
//!         if pool.is_root() {
//!             println!("{all:?}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Transfer Modes
//!
//! | Mode | Operations | Payload |
//! |------|------------|---------|
//! | [`TransferMode::Typed`] | [`Pool::gather_buffer`], [`Pool::bcast_buffer`] | slices of [`Datatype`], in place |
//! | [`TransferMode::Generic`] | [`Pool::gather`], [`Pool::bcast`], [`Pool::barrier`], [`Pool::sync_mask`] | any `serde` value |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

mod channel;
pub mod config;
mod datatype;
mod error;
pub mod local;
pub mod logging;
mod mask;
mod multiplexer;
mod pool;
mod request;
mod status;
mod transfer;

pub use channel::{Channel, RoundKind, Tag, TAG_WINDOW};
pub use config::{PoolConfig, TimeoutPolicy};
pub use datatype::{Datatype, DatatypeTag};
pub use error::{Error, Result};
pub use mask::Mask;
pub use multiplexer::{RequestMultiplexer, ResultMap};
pub use pool::Pool;
pub use request::{Completion, Direction, Request};
pub use status::{Signal, Status};
pub use transfer::TransferMode;
