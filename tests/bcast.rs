//! Masked broadcast from root, alone and combined with gather.

mod common;

use common::{run_group, GENEROUS, GENEROUS_TRIES};
use lossy_mpi::Status::*;

#[test]
fn bcast_reaches_every_live_peer() {
    let received = run_group(4, GENEROUS, GENEROUS_TRIES, |mut pool, _| {
        pool.ready();
        pool.sync_mask().unwrap();
        let value = if pool.is_root() {
            vec!["alpha".to_string(), "beta".to_string()]
        } else {
            Vec::new()
        };
        pool.bcast(value, vec!["fallback".to_string()]).unwrap()
    });

    for (rank, value) in received.iter().enumerate() {
        assert_eq!(value, &vec!["alpha".to_string(), "beta".to_string()], "rank {rank}");
    }
}

#[test]
fn bcast_buffer_in_place() {
    let bufs = run_group(3, GENEROUS, GENEROUS_TRIES, |mut pool, _| {
        pool.ready();
        let mut buf = if pool.is_root() { [1u64, 2, 3] } else { [0; 3] };
        pool.bcast_buffer(&mut buf, u64::MAX).unwrap();
        buf
    });
    assert_eq!(bufs, vec![[1, 2, 3]; 3]);
}

#[test]
fn bcast_skips_excluded_rank() {
    let results = run_group(4, GENEROUS, GENEROUS_TRIES, |mut pool, group| {
        let rank = pool.rank();
        pool.ready();
        if rank == 3 {
            pool.drop();
        }
        pool.sync_mask().unwrap();
        if pool.status() == Done {
            // an excluded rank has left its loop and must not call bcast
            return None;
        }

        let got = pool.bcast(42i64, -1).unwrap();
        if pool.is_root() {
            assert_eq!(pool.live_ranks(), vec![1, 2]);
            assert_eq!(group.queued_for(3).unwrap(), 0);
        }
        Some(got)
    });

    assert_eq!(results, vec![Some(42), Some(42), Some(42), None]);
}

#[test]
fn gather_sum_then_bcast_until_everyone_is_done() {
    let size = 4;
    let sums = run_group(size, GENEROUS, GENEROUS_TRIES, |mut pool, _| {
        let rank = pool.rank();
        pool.ready();

        let mut n_data = rank as i64 + 1;
        let mut data = None;
        let mut sums = Vec::new();

        loop {
            if n_data <= 0 {
                pool.drop();
            }
            pool.sync_mask().unwrap();

            if pool.is_root() {
                if pool.done() {
                    break;
                }
            } else if pool.status() == Done {
                break;
            }

            if n_data > 0 {
                data = Some(100 * (rank as i64 + 1) + n_data);
                n_data -= 1;
            }

            let all = pool.gather(data, None).unwrap();
            let total = if pool.is_root() {
                Some(all.iter().flatten().sum::<i64>())
            } else {
                None
            };
            sums.push(pool.bcast(total, None).unwrap());
        }
        sums
    });

    let root = &sums[0];
    // rank 3 has the most work; root keeps going until it drops
    assert_eq!(root.len(), 4);
    assert!(root.iter().all(Option::is_some));
    for (rank, seen) in sums.iter().enumerate().skip(1) {
        assert_eq!(seen.len(), rank + 1, "rank {rank}");
        assert_eq!(seen.as_slice(), &root[..=rank], "rank {rank}");
    }
}
