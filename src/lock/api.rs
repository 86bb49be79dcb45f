/// Raw lock interface.
///
/// # Safety
///
/// Implementations of this trait must ensure that the lock is actually exclusive: a lock can't be
/// acquired while the lock is already locked.
pub unsafe trait RawLock: Default + Send + Sync {
    /// Raw lock's token type.
    ///
    /// The token is handed back to [`RawLock::unlock`]. Region backends store it as a plain
    /// `usize`, so locks used there pick `usize` tokens.
    type Token;

    /// Acquires the raw lock.
    fn lock(&self) -> Self::Token;

    /// Releases the raw lock.
    ///
    /// # Safety
    ///
    /// - `self` must be a an acquired lock.
    /// - `token` must be from a [`RawLock::lock`] or [`RawTryLock::try_lock`] call to `self`.
    unsafe fn unlock(&self, token: Self::Token);
}

/// Raw lock interface for the try_lock API.
///
/// # Safety
///
/// See [`RawLock`] for safety requirements.
///
/// Also, [`RawTryLock::try_lock`] should return a token that can be used for [`RawLock::unlock`].
pub unsafe trait RawTryLock: RawLock {
    /// Tries to acquire the raw lock.
    fn try_lock(&self) -> Result<Self::Token, ()>;
}

#[cfg(test)]
pub mod tests {
    use core::cell::UnsafeCell;
    use std::thread::scope;

    use super::RawLock;

    /// A vector that may only be touched while `lock` is held.
    struct Guarded<L> {
        lock: L,
        data: UnsafeCell<Vec<usize>>,
    }

    // SAFETY: `data` is only accessed between `lock` and `unlock`.
    unsafe impl<L: RawLock> Sync for Guarded<L> {}

    pub fn smoke<L: RawLock>() {
        const LENGTH: usize = 1024;
        let d = Guarded {
            lock: L::default(),
            data: UnsafeCell::new(Vec::new()),
        };

        scope(|s| {
            let d = &d;
            for i in 1..LENGTH {
                s.spawn(move || {
                    let token = d.lock.lock();
                    // SAFETY: the lock is held.
                    unsafe { (*d.data.get()).push(i) };
                    // SAFETY: `token` comes from the `lock` call above.
                    unsafe { d.lock.unlock(token) };
                });
            }
        });

        let mut d = d.data.into_inner();
        d.sort_unstable();
        assert_eq!(d, (1..LENGTH).collect::<Vec<usize>>());
    }
}
