use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, scope};
use std::time::{Duration, Instant};

use rand::prelude::*;
use tmsync::{Shared, SyncPolicy};

const ACCOUNTS: usize = 8;
const THREADS: usize = 8;
const STEPS: usize = 2000;

/// Random transfers between accounts keep the total constant, and declined transfers leave no
/// trace.
fn transfers(policy: SyncPolicy) {
    let shared = Shared::new(policy, vec![100i64; ACCOUNTS]);

    scope(|s| {
        for _ in 0..THREADS {
            let _ = s.spawn(|| {
                let mut rng = thread_rng();
                for _ in 0..STEPS {
                    let from = rng.gen_range(0..ACCOUNTS);
                    let to = rng.gen_range(0..ACCOUNTS);
                    let amount = rng.gen_range(1..50);
                    let _ = shared.atomically(|accounts| {
                        accounts[from] -= amount;
                        accounts[to] += amount;
                        if accounts[from] < 0 {
                            Err(())
                        } else {
                            Ok(())
                        }
                    });
                }
            });
        }
    });

    let stats = shared.stats();
    assert_eq!(stats.entries, (THREADS * STEPS) as u64);
    let accounts = shared.into_inner();
    assert_eq!(accounts.iter().sum::<i64>(), 100 * ACCOUNTS as i64);
    assert!(accounts.iter().all(|balance| *balance >= 0));
}

#[test]
fn transfers_exclusive() {
    transfers(SyncPolicy::Exclusive);
}

#[test]
fn transfers_optimistic() {
    transfers(SyncPolicy::Optimistic);
}

#[test]
fn optimistic_body_runs_while_another_region_is_open() {
    let shared = Shared::new(SyncPolicy::Optimistic, 0);
    let started = AtomicBool::new(false);
    let runs = AtomicUsize::new(0);

    let guard = shared.enter();
    scope(|s| {
        let _ = s.spawn(|| {
            shared.critical(|v| {
                started.store(true, Ordering::SeqCst);
                let _ = runs.fetch_add(1, Ordering::SeqCst);
                *v += 1;
            })
        });

        let deadline = Instant::now() + Duration::from_secs(10);
        while !started.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::yield_now();
        }
        assert!(started.load(Ordering::SeqCst));

        // The speculative region cannot commit while the guard is alive.
        thread::sleep(Duration::from_millis(50));
        let mut guard = guard;
        *guard += 10;
    });

    let stats = shared.stats();
    assert!(stats.conflicts >= 1);
    assert_eq!(stats.conflicts as usize + 1, runs.into_inner());
    assert_eq!(stats.entries, 2);
    assert_eq!(shared.into_inner(), 11);
}

#[test]
fn sequential_none() {
    let shared = Shared::new(SyncPolicy::None, Vec::new());
    for i in 0..100 {
        shared.critical(|v| v.push(i));
    }
    assert_eq!(shared.stats().entries, 100);
    assert_eq!(shared.into_inner(), (0..100).collect::<Vec<_>>());
}

#[test]
fn policies_round_trip_through_names() {
    for policy in SyncPolicy::ALL {
        assert_eq!(policy.name().parse::<SyncPolicy>(), Ok(policy));
        assert_eq!(Shared::new(policy, ()).policy(), policy);
    }
}
