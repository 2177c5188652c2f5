//! Helpers for running one pool per thread over an in-process group.

#![allow(dead_code)]

use lossy_mpi::local::{LocalChannel, LocalGroup};
use lossy_mpi::Pool;
use std::thread;
use std::time::Duration;

/// Budget used by scenarios that expect every rank to answer.
pub const GENEROUS: Duration = Duration::from_secs(3);
/// Polls within [`GENEROUS`].
pub const GENEROUS_TRIES: u32 = 300;

/// Run `body` on every rank of a `size`-rank group rooted at rank 0, one
/// thread per rank, and return each rank's result in rank order. A panic on
/// any rank fails the test.
pub fn run_group<R, F>(size: usize, timeout: Duration, n_tries: u32, body: F) -> Vec<R>
where
    R: Send,
    F: Fn(Pool<LocalChannel>, &LocalGroup) -> R + Sync,
{
    run_group_rooted(size, 0, timeout, n_tries, body)
}

/// Like [`run_group`], with `root` coordinating.
pub fn run_group_rooted<R, F>(
    size: usize,
    root: usize,
    timeout: Duration,
    n_tries: u32,
    body: F,
) -> Vec<R>
where
    R: Send,
    F: Fn(Pool<LocalChannel>, &LocalGroup) -> R + Sync,
{
    let (group, channels) = LocalGroup::new(size);
    let body = &body;
    let group = &group;
    thread::scope(|s| {
        let handles: Vec<_> = channels
            .into_iter()
            .map(|ch| {
                s.spawn(move || {
                    let pool = Pool::new(ch, root, timeout, n_tries).expect("pool construction");
                    body(pool, group)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank panicked"))
            .collect()
    })
}
