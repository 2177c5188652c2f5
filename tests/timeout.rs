//! Behaviour when ranks stop answering.

mod common;

use common::{run_group, GENEROUS, GENEROUS_TRIES};
use lossy_mpi::local::LocalGroup;
use lossy_mpi::Pool;
use lossy_mpi::Status::*;
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn silent_rank_gets_fallback_within_budget() {
    let timeout = Duration::from_millis(300);
    let checkpoint = Barrier::new(4);

    let results = run_group(4, timeout, 3, |mut pool, group| {
        let rank = pool.rank();
        pool.ready();
        // everyone is heard from once, so the mask is all Ready
        pool.sync_mask().unwrap();
        checkpoint.wait();
        if rank == 2 {
            group.mute(2).unwrap();
        }
        checkpoint.wait();

        let start = Instant::now();
        let all = pool.gather(Some(rank), None).unwrap();
        (all, start.elapsed(), pool.mask().as_slice().to_vec())
    });

    let (all, elapsed, mask) = &results[0];
    assert_eq!(all, &vec![Some(0), Some(1), None, Some(3)]);
    // two sleeps of timeout / n_tries before giving up on rank 2
    assert!(*elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(*elapsed < Duration::from_secs(2), "{elapsed:?}");
    // a data round does not touch the mask
    assert_eq!(mask, &vec![Ready; 4]);
}

#[test]
fn silent_rank_is_stamped_timeout_and_never_contacted_again() {
    let checkpoint = Barrier::new(3);
    let timeout = Duration::from_millis(150);

    let results = run_group(3, timeout, 3, |mut pool, group| {
        let rank = pool.rank();
        pool.ready();
        if rank == 1 {
            group.mute(1).unwrap();
        }
        checkpoint.wait();
        pool.sync_mask().unwrap();
        if rank == 1 {
            return None;
        }

        // several rounds later rank 1 is still skipped, without any waiting
        let mut slowest = Duration::ZERO;
        let mut last = Vec::new();
        for round in 0..3 {
            let start = Instant::now();
            last = pool.gather(Some(round * 10 + rank), None).unwrap();
            slowest = slowest.max(start.elapsed());
        }
        Some((last, slowest, pool.mask().as_slice().to_vec()))
    });

    let (last, slowest, mask) = results[0].clone().unwrap();
    assert_eq!(mask, vec![Ready, Timeout, Ready]);
    assert_eq!(last, vec![Some(20), None, Some(22)]);
    assert!(slowest < timeout, "{slowest:?}");
}

#[test]
fn late_reply_is_not_taken_by_the_next_round() {
    let checkpoint = Barrier::new(3);

    let results = run_group(3, Duration::from_millis(200), 2, |mut pool, group| {
        let rank = pool.rank() as i32;
        pool.ready();

        // rank 2 answers round 1 long after root gave up on it
        if rank == 2 {
            thread::sleep(Duration::from_millis(500));
        }
        let first = pool.gather(Some(rank), None).unwrap();
        checkpoint.wait();

        let second = pool.gather(Some(100 + rank), None).unwrap();
        checkpoint.wait();
        (first, second, group.queued_for(0).unwrap())
    });

    let (first, second, queued) = &results[0];
    assert_eq!(first, &vec![Some(0), Some(1), None]);
    assert_eq!(second, &vec![Some(100), Some(101), Some(102)]);
    // the round-1 reply never matches a receive and stays in the mailbox
    assert_eq!(*queued, 1);
}

#[test]
fn barrier_returns_under_universal_silence() {
    let (_, mut channels) = LocalGroup::new(4);
    channels.truncate(1);
    let mut root = Pool::new(channels.pop().unwrap(), 0, Duration::from_millis(90), 3).unwrap();

    let start = Instant::now();
    root.barrier().unwrap();
    let elapsed = start.elapsed();

    // three peers, two sleeps of 30ms each
    assert!(elapsed >= Duration::from_millis(180), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
}

#[test]
fn barrier_with_everyone_present() {
    let done = run_group(4, GENEROUS, GENEROUS_TRIES, |mut pool, _| {
        pool.ready();
        pool.barrier().unwrap();
        pool.barrier().unwrap();
        pool.transaction()
    });
    assert_eq!(done, vec![2; 4]);
}

#[test]
fn bcast_from_silent_root_falls_back() {
    let (group, channels) = LocalGroup::new(2);
    group.mute(0).unwrap();
    let mut channels = channels.into_iter();
    let mut root = Pool::new(channels.next().unwrap(), 0, Duration::from_millis(40), 4).unwrap();
    let mut peer = Pool::new(channels.next().unwrap(), 0, Duration::from_millis(40), 4).unwrap();

    root.ready();
    peer.ready();
    assert_eq!(root.bcast(7u16, 0).unwrap(), 7);
    assert_eq!(peer.bcast(0u16, u16::MAX).unwrap(), u16::MAX);

    let mut buf = [5i32; 3];
    peer.bcast_buffer(&mut buf, -1).unwrap();
    assert_eq!(buf, [-1; 3]);
}
