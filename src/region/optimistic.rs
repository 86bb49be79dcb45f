//! Optimistic regions.
//!
//! A speculative region copies the committed state, runs its body on the copy without holding
//! anything, and then tries to commit. The commit succeeds only if the version word
//! ([`RawSeqLock`]) still holds the version the copy was taken at and no irrevocable region is
//! open. Otherwise the attempt conflicts: the copy is discarded and the body runs again from a
//! fresh copy after a backoff. Bodies of concurrent regions therefore really overlap, and only
//! their commits are serialized.
//!
//! The version word doubles as a short latch. Taking a copy holds it while cloning and restores
//! the old version; committing holds it while the copy is swapped in and publishes the next one.
//!
//! Regions opened with [`RawRegion::enter`] are irrevocable. They hold the owner lock from the
//! start, which makes every speculative commit fail until they are done, so their own commit can
//! never conflict.

use core::cell::UnsafeCell;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering::Relaxed;

use crossbeam_utils::Backoff;
use log::{trace, warn};

use super::{RawRegion, RegionStats, SyncPolicy};
use crate::lock::{RawLock, RawSeqLock, RawTryLock, TicketLock};

/// Consecutive conflicts after which a region reports contention.
const CONFLICT_WARN_STREAK: usize = 1024;

/// The `tm` backend.
#[derive(Debug, Default)]
pub struct Optimistic {
    owner: TicketLock,
    version: RawSeqLock,
    entries: AtomicU64,
    conflicts: AtomicU64,
}

/// Holds the version word while the committed state is read.
struct Latch<'a> {
    version: &'a RawSeqLock,
    seq: usize,
}

impl Drop for Latch<'_> {
    fn drop(&mut self) {
        self.version.restore(self.seq);
    }
}

impl Optimistic {
    /// Copies the committed state, returning the version the copy was taken at.
    pub(crate) fn snapshot<T: Clone>(&self, data: &UnsafeCell<T>) -> (usize, T) {
        let latch = Latch {
            version: &self.version,
            seq: self.version.claim(),
        };
        // SAFETY: the state is only written while the version word is held, and we hold it.
        let copy = unsafe { (*data.get()).clone() };
        (latch.seq, copy)
    }

    /// Replaces the committed state and publishes the next version.
    ///
    /// The caller must hold the owner lock.
    pub(crate) fn publish<T>(&self, data: &UnsafeCell<T>, value: T) {
        let seq = self.version.claim();
        // SAFETY: holding the version word keeps every reader and writer out.
        unsafe { *data.get() = value };
        self.version.release(seq);
    }

    /// Commits `copy` if nobody committed since version `seen` and no irrevocable region is
    /// open. Returns `false` on conflict.
    fn commit<T>(&self, data: &UnsafeCell<T>, seen: usize, copy: T) -> bool {
        let Ok(ticket) = self.owner.try_lock() else {
            return false;
        };

        // Every commit holds the owner lock, so the version cannot move while we compare.
        let committed = self.version.version() & !1 == seen;
        if committed {
            self.publish(data, copy);
            let _ = self.entries.fetch_add(1, Relaxed);
        }

        // SAFETY: `ticket` comes from the `try_lock` above.
        unsafe { self.owner.unlock(ticket) };
        committed
    }

    /// Checks that an aborting region read a state that is still the committed one.
    fn validate(&self, seen: usize) -> bool {
        let seq = self.version.claim();
        self.version.restore(seq);
        let valid = seq == seen;
        if valid {
            let _ = self.entries.fetch_add(1, Relaxed);
        }
        valid
    }

    /// Runs `body` speculatively until it either commits or ends in a validated business abort.
    ///
    /// `body` sees a private copy of the state and may run more than once. A body returning `Err`
    /// never publishes its copy.
    pub(crate) fn run<T, R, E, F>(&self, data: &UnsafeCell<T>, mut body: F) -> Result<R, E>
    where
        T: Clone,
        F: FnMut(&mut T) -> Result<R, E>,
    {
        let backoff = Backoff::new();
        let mut streak = 0;

        loop {
            let (seen, mut copy) = self.snapshot(data);
            let result = body(&mut copy);
            let done = match result {
                Ok(_) => self.commit(data, seen, copy),
                Err(_) => self.validate(seen),
            };
            if done {
                return result;
            }

            let _ = self.conflicts.fetch_add(1, Relaxed);
            streak += 1;
            trace!("region conflict after version {seen}, retrying (streak {streak})");
            if streak == CONFLICT_WARN_STREAK {
                warn!("optimistic region retried {streak} times without committing");
            }
            backoff.snooze();
        }
    }
}

unsafe impl RawRegion for Optimistic {
    fn enter(&self) -> usize {
        let ticket = self.owner.lock();
        let _ = self.entries.fetch_add(1, Relaxed);
        ticket
    }

    unsafe fn leave(&self, token: usize) {
        // SAFETY: the caller passes the ticket returned by `enter`.
        unsafe { self.owner.unlock(token) };
    }

    fn policy(&self) -> SyncPolicy {
        SyncPolicy::Optimistic
    }

    fn stats(&self) -> RegionStats {
        RegionStats {
            entries: self.entries.load(Relaxed),
            conflicts: self.conflicts.load(Relaxed),
            aborts: 0,
        }
    }

    fn speculation(&self) -> Option<&Optimistic> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use core::cell::UnsafeCell;

    use super::Optimistic;
    use crate::region::RawRegion;

    #[test]
    fn stale_copy_does_not_commit() {
        let region = Optimistic::default();
        let data = UnsafeCell::new(vec![1]);

        let (seen, mut stale) = region.snapshot(&data);
        let (_, mut fresh) = region.snapshot(&data);
        fresh.push(2);
        assert!(region.commit(&data, seen, fresh));

        stale.push(3);
        assert!(!region.commit(&data, seen, stale));
        assert_eq!(data.into_inner(), vec![1, 2]);
        assert_eq!(region.stats().entries, 1);
    }

    #[test]
    fn irrevocable_region_blocks_commits() {
        let region = Optimistic::default();
        let data = UnsafeCell::new(0);

        let token = region.enter();
        let (seen, copy) = region.snapshot(&data);
        assert!(!region.commit(&data, seen, copy + 1));
        region.publish(&data, 10);
        unsafe { region.leave(token) };

        let (seen, copy) = region.snapshot(&data);
        assert!(region.commit(&data, seen, copy + 1));
        assert_eq!(data.into_inner(), 11);
    }

    #[test]
    fn retries_count_only_failed_commits() {
        let region = Optimistic::default();
        let data = UnsafeCell::new(0);
        let mut runs = 0;

        let r: Result<i32, ()> = region.run(&data, |v| {
            runs += 1;
            if runs == 1 {
                // Another region commits while this body runs.
                let (seen, copy) = region.snapshot(&data);
                assert!(region.commit(&data, seen, copy + 100));
            }
            *v += 1;
            Ok(*v)
        });

        assert_eq!(r, Ok(101));
        assert_eq!(runs, 2);
        assert_eq!(data.into_inner(), 101);
        let stats = region.stats();
        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.entries, 2);
    }
}
