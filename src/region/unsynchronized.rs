use core::sync::atomic::Ordering::*;
use core::sync::atomic::{AtomicBool, AtomicU64};

use super::{RawRegion, RegionStats, SyncPolicy};

/// The `none` backend: regions cost nothing and serialize nothing.
///
/// Only one worker may use it at a time. Instead of silently handing out aliasing mutable
/// access, overlapping regions panic.
#[derive(Debug, Default)]
pub struct Unsynchronized {
    busy: AtomicBool,
    entries: AtomicU64,
}

unsafe impl RawRegion for Unsynchronized {
    fn enter(&self) -> usize {
        if self.busy.swap(true, Acquire) {
            panic!("unsynchronized region entered concurrently: use `mutex` or `tm` with more than one worker");
        }
        let _ = self.entries.fetch_add(1, Relaxed);
        0
    }

    unsafe fn leave(&self, _token: usize) {
        self.busy.store(false, Release);
    }

    fn policy(&self) -> SyncPolicy {
        SyncPolicy::None
    }

    fn stats(&self) -> RegionStats {
        RegionStats {
            entries: self.entries.load(Relaxed),
            ..RegionStats::default()
        }
    }
}
