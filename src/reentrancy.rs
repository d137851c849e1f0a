//! Debug-only reentrancy detection for `ChainHashMap`.
//!
//! The map calls user code in exactly two places: `K: Hash` when hashing a
//! query and `K: Eq` while scanning a bucket. Both run inside a [`Section`].
//! A key impl that reaches back into the same map from there (through a raw
//! pointer or a shared handle) would observe a bucket mid-scan, so the
//! second entry panics in debug builds.
//!
//! Destructors run outside the section: `delete`, `pop` and
//! `clear` hand removed entries out of the section before dropping them,
//! and `set` returns the displaced value. Those drops may use the map.
//!
//! A panic inside `Hash`/`Eq` unwinds through the section and releases it,
//! leaving the map usable. Release builds compile the check away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Busy flag embedded in every map. The raw-pointer marker keeps the map
/// `!Send`/`!Sync`.
#[derive(Debug)]
pub(crate) struct ReentrancyCheck {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    _not_thread_safe: PhantomData<*mut ()>,
}

impl ReentrancyCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _not_thread_safe: PhantomData,
        }
    }

    /// Open a section for one map operation.
    ///
    /// Panics in debug builds if an operation on the same map is already
    /// running further up the stack.
    #[inline]
    pub(crate) fn enter(&self) -> Section<'_> {
        #[cfg(debug_assertions)]
        {
            let was_busy = self.busy.replace(true);
            assert!(
                !was_busy,
                "reentrancy detected: map accessed from inside Hash/Eq of a key"
            );
            return Section { flag: &self.busy };
        }

        #[cfg(not(debug_assertions))]
        {
            return Section { _map: PhantomData };
        }
    }
}

/// Open map operation; closing it is the drop.
pub(crate) struct Section<'a> {
    #[cfg(debug_assertions)]
    flag: &'a Cell<bool>,
    #[cfg(not(debug_assertions))]
    _map: PhantomData<&'a ()>,
}

impl Drop for Section<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.flag.set(false);
    }
}
