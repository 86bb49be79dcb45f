use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering::*;

use crossbeam_utils::{Backoff, CachePadded};

use crate::lock::*;

/// A ticket lock.
///
/// Waiters are served in the order they took their ticket, so a busy region cannot starve one
/// worker in favor of another.
#[derive(Debug)]
pub struct TicketLock {
    curr: CachePadded<AtomicUsize>,
    next: CachePadded<AtomicUsize>,
}

impl Default for TicketLock {
    fn default() -> Self {
        Self {
            curr: CachePadded::new(AtomicUsize::new(0)),
            next: CachePadded::new(AtomicUsize::new(0)),
        }
    }
}

unsafe impl RawLock for TicketLock {
    type Token = usize;

    fn lock(&self) -> usize {
        let ticket = self.next.fetch_add(1, Relaxed);
        let backoff = Backoff::new();

        while self.curr.load(Acquire) != ticket {
            backoff.snooze();
        }

        ticket
    }

    unsafe fn unlock(&self, ticket: usize) {
        self.curr.store(ticket.wrapping_add(1), Release);
    }
}

unsafe impl RawTryLock for TicketLock {
    fn try_lock(&self) -> Result<usize, ()> {
        let ticket = self.curr.load(Acquire);
        self.next
            .compare_exchange(ticket, ticket.wrapping_add(1), Acquire, Relaxed)
            .map_err(|_| ())
    }
}
