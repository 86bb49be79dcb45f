//! A raw sequence lock used as a version word.
//!
//! An even value means the protected state is quiescent; an odd value means somebody holds it.
//! Holding it to replace the state advances the value by two on release, while holding it only to
//! read restores the old value. A region that observed an even value can therefore tell whether
//! anybody committed in between.

use core::sync::atomic::{fence, AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

/// A raw sequence lock.
#[derive(Debug)]
pub struct RawSeqLock {
    seq: CachePadded<AtomicUsize>,
}

impl Default for RawSeqLock {
    fn default() -> Self {
        Self::new()
    }
}

impl RawSeqLock {
    /// Creates a new raw sequence lock.
    pub const fn new() -> Self {
        Self {
            seq: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the current version. Odd means owned.
    pub fn version(&self) -> usize {
        self.seq.load(Ordering::Acquire)
    }

    /// Claims ownership if the version is still `seq`.
    ///
    /// Returns the version actually observed on failure: either another owner (odd) or a newer
    /// quiescent version (some owner committed after `seq` was read).
    pub fn try_claim(&self, seq: usize) -> Result<(), usize> {
        debug_assert!(seq & 1 == 0, "claiming from an owned version");

        self.seq
            .compare_exchange(
                seq,
                seq.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .map(|_| fence(Ordering::Release))
    }

    /// Claims ownership, waiting for the current owner if any.
    pub fn claim(&self) -> usize {
        let backoff = Backoff::new();

        loop {
            let seq = self.seq.load(Ordering::Relaxed);
            if seq & 1 == 0 && self.try_claim(seq).is_ok() {
                return seq;
            }

            backoff.snooze();
        }
    }

    /// Releases ownership claimed from version `seq`, publishing version `seq + 2`.
    pub fn release(&self, seq: usize) {
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Releases ownership claimed from version `seq` without publishing a new version.
    pub fn restore(&self, seq: usize) {
        self.seq.store(seq, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::thread::scope;

    use super::RawSeqLock;

    #[test]
    fn claim_advances_version() {
        let lock = RawSeqLock::new();
        assert_eq!(lock.version(), 0);

        lock.try_claim(0).unwrap();
        assert_eq!(lock.version(), 1);
        assert_eq!(lock.try_claim(0), Err(1));

        lock.release(0);
        assert_eq!(lock.version(), 2);

        // A claim from a stale version is a conflict even though nobody owns the lock now.
        assert_eq!(lock.try_claim(0), Err(2));
        lock.try_claim(2).unwrap();
        lock.release(2);
        assert_eq!(lock.version(), 4);

        // Reads hold the lock but leave the version alone.
        let seq = lock.claim();
        assert_eq!(lock.version(), 5);
        lock.restore(seq);
        assert_eq!(lock.version(), 4);
    }

    #[test]
    fn claim_is_exclusive() {
        const THREADS: usize = 8;
        const STEPS: usize = 1000;

        let lock = RawSeqLock::new();
        let counter = core::sync::atomic::AtomicUsize::new(0);

        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..STEPS {
                        let seq = lock.claim();
                        // Non-atomic read-modify-write made safe by ownership.
                        let v = counter.load(core::sync::atomic::Ordering::Relaxed);
                        counter.store(v + 1, core::sync::atomic::Ordering::Relaxed);
                        lock.release(seq);
                    }
                });
            }
        });

        assert_eq!(counter.into_inner(), THREADS * STEPS);
        assert_eq!(lock.version(), 2 * THREADS * STEPS);
    }
}
