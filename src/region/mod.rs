//! Bracketed access to shared state.
//!
//! Every mutation of a shared collection happens inside a *region*: a scoped begin/end pair
//! backed by one of three interchangeable backends. The backend is picked once, at startup, as a
//! [`SyncPolicy`] value and handed to [`Shared::new`]. Code running inside a region never learns
//! which backend it runs under.
//!
//! ```
//! use tmsync::{Shared, SyncPolicy};
//!
//! let sum = Shared::new(SyncPolicy::Exclusive, 0u64);
//! std::thread::scope(|s| {
//!     for i in 1..=4 {
//!         let sum = &sum;
//!         s.spawn(move || sum.critical(|sum| *sum += i));
//!     }
//! });
//! assert_eq!(sum.into_inner(), 10);
//! ```

mod exclusive;
mod optimistic;
mod unsynchronized;

use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::str::FromStr;
use core::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use thiserror::Error;

pub use exclusive::Exclusive;
pub use optimistic::Optimistic;
pub use unsynchronized::Unsynchronized;

/// The synchronization discipline applied to every region of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPolicy {
    /// No synchronization. Only valid while a single worker touches the shared state.
    None,
    /// One lock per shared instance, held for the whole region.
    Exclusive,
    /// Speculative regions that run on a private copy and retry on conflict.
    Optimistic,
}

/// Returned when a policy name does not match any backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown synchronization policy `{0}` (expected `none`, `mutex` or `tm`)")]
pub struct UnknownPolicy(pub String);

impl SyncPolicy {
    /// All policies, in increasing order of machinery.
    pub const ALL: [Self; 3] = [Self::None, Self::Exclusive, Self::Optimistic];

    /// The short name accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Exclusive => "mutex",
            Self::Optimistic => "tm",
        }
    }

    /// The upper-case tag printed in run reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Exclusive => "MUTEX",
            Self::Optimistic => "TM",
        }
    }

    /// Whether more than one worker may enter regions at the same time.
    pub fn allows_parallel(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Creates a fresh backend for one shared instance.
    pub fn backend(self) -> Box<dyn RawRegion> {
        match self {
            Self::None => Box::<Unsynchronized>::default(),
            Self::Exclusive => Box::<Exclusive>::default(),
            Self::Optimistic => Box::<Optimistic>::default(),
        }
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SyncPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "mutex" | "exclusive" | "lock" => Ok(Self::Exclusive),
            "tm" | "optimistic" | "stm" => Ok(Self::Optimistic),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Counters kept by a region backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegionStats {
    /// Regions completed. A region that was retried counts once.
    pub entries: u64,
    /// Speculative attempts discarded because another region committed first.
    pub conflicts: u64,
    /// Regions that ended in a business abort and had their effects discarded.
    pub aborts: u64,
}

/// Raw region backend.
///
/// The trait is object safe so that the backend can be chosen at runtime and stored as
/// `Box<dyn RawRegion>`.
///
/// # Safety
///
/// If [`RawRegion::speculation`] returns `None`, then between a successful [`RawRegion::enter`]
/// and the matching [`RawRegion::leave`] no other caller may be inside a region of the same
/// backend. Backends that cannot enforce this by waiting must detect the overlap and panic.
///
/// If it returns `Some`, the state is only touched through the returned [`Optimistic`], and
/// `enter` must keep every other commit out until `leave`.
pub unsafe trait RawRegion: Send + Sync + fmt::Debug {
    /// Enters a region, returning the token to pass to [`RawRegion::leave`].
    fn enter(&self) -> usize;

    /// Leaves a region.
    ///
    /// # Safety
    ///
    /// `token` must come from an [`RawRegion::enter`] call on `self` that has not been left yet.
    unsafe fn leave(&self, token: usize);

    /// The policy this backend implements.
    fn policy(&self) -> SyncPolicy;

    /// Entry and conflict counters. `aborts` is tracked by [`Shared`] and reported as zero here.
    fn stats(&self) -> RegionStats;

    /// The speculation engine, for backends whose regions run on a private copy of the state.
    fn speculation(&self) -> Option<&Optimistic> {
        None
    }
}

/// Shared state whose every access is bracketed by a region.
pub struct Shared<T> {
    raw: Box<dyn RawRegion>,
    aborts: AtomicU64,
    data: UnsafeCell<T>,
}

// SAFETY: threads only reach the state from inside a region, and the backend either makes regions
// exclusive or hands each one a private copy and serializes the swaps. `T: Send` is required since
// the state may be touched from any worker.
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("raw", &self.raw)
            .field("aborts", &self.aborts.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T> Shared<T> {
    /// Wraps `data` with a fresh backend for `policy`.
    pub fn new(policy: SyncPolicy, data: T) -> Self {
        debug!("creating shared state guarded by `{policy}`");
        Self::with_backend(policy.backend(), data)
    }

    /// Wraps `data` with the given backend.
    pub fn with_backend(raw: Box<dyn RawRegion>, data: T) -> Self {
        Self {
            raw,
            aborts: AtomicU64::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// The policy of the backend guarding this state.
    pub fn policy(&self) -> SyncPolicy {
        self.raw.policy()
    }

    /// Counters for this instance.
    pub fn stats(&self) -> RegionStats {
        RegionStats {
            aborts: self.aborts.load(Ordering::Relaxed),
            ..self.raw.stats()
        }
    }

    /// Accesses the state without a region; exclusive ownership already rules out races.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Destroys the wrapper and returns the state.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Clone> Shared<T> {
    /// Enters an irrevocable region. The region ends when the guard is dropped, on every exit
    /// path.
    ///
    /// Under [`SyncPolicy::Optimistic`] the guard works on a private copy that is committed when
    /// it drops. Speculative regions keep running meanwhile but cannot commit until then.
    pub fn enter(&self) -> RegionGuard<'_, T> {
        let token = self.raw.enter();
        let copy = self
            .raw
            .speculation()
            .map(|engine| engine.snapshot(&self.data).1);
        RegionGuard {
            shared: self,
            token,
            copy,
            _marker: PhantomData,
        }
    }

    /// Runs `f` inside one region.
    ///
    /// Under [`SyncPolicy::Optimistic`], `f` runs on a private copy and runs again whenever its
    /// commit conflicts, so it must not have effects outside the state it is given.
    pub fn critical<R, F>(&self, mut f: F) -> R
    where
        F: FnMut(&mut T) -> R,
    {
        match self.raw.speculation() {
            Some(engine) => match engine.run(&self.data, |state| Ok::<R, Infallible>(f(state))) {
                Ok(r) => r,
                Err(never) => match never {},
            },
            None => {
                let mut guard = self.enter();
                f(&mut guard)
            }
        }
    }

    /// Runs `f` inside one region that may end in a business abort.
    ///
    /// Returning `Err(e)` from `f` discards every change `f` made to the state and hands `e`
    /// back to the caller. The region is not retried for that. Conflicts are a separate matter:
    /// under [`SyncPolicy::Optimistic`] a conflicting attempt is thrown away and `f` runs again,
    /// whether it was about to return `Ok` or `Err`.
    pub fn atomically<R, E, F>(&self, mut f: F) -> Result<R, E>
    where
        F: FnMut(&mut Region<'_, T>) -> Result<R, E>,
    {
        let result = match self.raw.speculation() {
            Some(engine) => engine.run(&self.data, |state| f(&mut Region::private(state))),
            None => {
                let mut guard = self.enter();
                let mut region = Region::in_place(&mut *guard);
                let result = f(&mut region);
                if result.is_err() {
                    region.rollback();
                }
                result
            }
        };

        if result.is_err() {
            let _ = self.aborts.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(SyncPolicy::Exclusive, T::default())
    }
}

/// A guard that holds a region open and dereferences the state.
pub struct RegionGuard<'s, T> {
    shared: &'s Shared<T>,
    token: usize,
    /// The private copy, when the backend speculates.
    copy: Option<T>,
    _marker: PhantomData<&'s mut T>,
}

impl<T: fmt::Debug> fmt::Debug for RegionGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegionGuard").field(&**self).finish()
    }
}

impl<T> Drop for RegionGuard<'_, T> {
    fn drop(&mut self) {
        if let (Some(copy), Some(engine)) = (self.copy.take(), self.shared.raw.speculation()) {
            engine.publish(&self.shared.data, copy);
        }
        // SAFETY: `self.token` was returned by the `enter` call that created this guard, and the
        // guard is dropped exactly once.
        unsafe { self.shared.raw.leave(self.token) };
    }
}

impl<T> Deref for RegionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match &self.copy {
            Some(copy) => copy,
            // SAFETY: the region is open, so nobody else accesses the state.
            None => unsafe { &*self.shared.data.get() },
        }
    }
}

impl<T> DerefMut for RegionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.copy {
            Some(copy) => copy,
            // SAFETY: the region is open and `&mut self` proves this is the only path to the
            // state.
            None => unsafe { &mut *self.shared.data.get() },
        }
    }
}

/// The state as seen from inside an abortable region.
///
/// When the region works on the shared state in place, the first mutable access saves a
/// before-image, which a business abort restores. A private copy needs none: an abort just drops
/// it.
pub struct Region<'r, T: Clone> {
    state: &'r mut T,
    before: Option<T>,
    private: bool,
    dirty: bool,
}

impl<T: Clone + fmt::Debug> fmt::Debug for Region<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("state", &self.state)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl<'r, T: Clone> Region<'r, T> {
    fn in_place(state: &'r mut T) -> Self {
        Self {
            state,
            before: None,
            private: false,
            dirty: false,
        }
    }

    fn private(state: &'r mut T) -> Self {
        Self {
            state,
            before: None,
            private: true,
            dirty: false,
        }
    }

    /// Whether the region has asked for mutable access yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn rollback(&mut self) {
        if let Some(before) = self.before.take() {
            *self.state = before;
        }
    }
}

impl<T: Clone> Deref for Region<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.state
    }
}

impl<T: Clone> DerefMut for Region<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        if !self.private && self.before.is_none() {
            self.before = Some(self.state.clone());
        }
        self.dirty = true;
        self.state
    }
}
