//! Locks.

mod api;
pub mod seqlock;
mod ticketlock;

pub use api::{RawLock, RawTryLock};
pub use seqlock::RawSeqLock;
pub use ticketlock::TicketLock;
