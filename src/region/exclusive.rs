use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering::Relaxed;

use super::{RawRegion, RegionStats, SyncPolicy};
use crate::lock::{RawLock, TicketLock};

/// The `mutex` backend: one lock held for the whole region.
#[derive(Debug, Default)]
pub struct Exclusive {
    lock: TicketLock,
    entries: AtomicU64,
}

unsafe impl RawRegion for Exclusive {
    fn enter(&self) -> usize {
        let ticket = self.lock.lock();
        let _ = self.entries.fetch_add(1, Relaxed);
        ticket
    }

    unsafe fn leave(&self, token: usize) {
        // SAFETY: the caller passes the ticket returned by `enter`.
        unsafe { self.lock.unlock(token) };
    }

    fn policy(&self) -> SyncPolicy {
        SyncPolicy::Exclusive
    }

    fn stats(&self) -> RegionStats {
        RegionStats {
            entries: self.entries.load(Relaxed),
            ..RegionStats::default()
        }
    }
}
