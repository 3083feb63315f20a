//! Cancellation token for blocking waits.
//!
//! An [`Interrupt`] is handed to every blocking call. Raising it wakes every
//! waiter currently parked on behalf of the token; those waiters give up and
//! report [`WaitError::Interrupted`](crate::WaitError::Interrupted).
//!
//! # Wakeup protocol
//!
//! ```text
//! waiter                               raiser
//! ──────                               ──────
//! lock(permits)                        raised = true
//! register watcher                     snapshot watchers
//! check raised ── false ─┐             for each watcher:
//! cond.wait(permits) ◄───┘                 lock(permits)
//!                                          notify_all
//! ```
//!
//! The raiser takes each watcher's permit lock before notifying, so a waiter
//! that has already checked the flag is guaranteed to be parked when the
//! notification arrives.

use crate::semaphore::Shared;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Cloneable cancellation handle. Clones share the same flag.
#[derive(Clone, Default)]
pub struct Interrupt {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    raised: AtomicBool,
    /// Semaphores with a waiter currently parked on behalf of this token.
    watchers: Mutex<Vec<Weak<Shared>>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the interrupt and wakes every waiter parked on this token.
    ///
    /// The flag stays raised until [`clear`](Self::clear) is called, so waits
    /// started afterwards that would block fail immediately.
    pub fn raise(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);

        // Snapshot first: the watcher list lock must never be held while
        // taking a permit lock (waiters take them in the opposite order).
        let watched: Vec<Arc<Shared>> = self
            .watchers()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        for shared in watched {
            let _permits = shared.lock_permits();
            shared.cond.notify_all();
        }
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Lowers the flag so the token can guard new waits.
    pub fn clear(&self) {
        self.inner.raised.store(false, Ordering::SeqCst);
    }

    /// Registers `shared` as watched until the returned guard drops.
    pub(crate) fn watch(&self, shared: &Arc<Shared>) -> Watch<'_> {
        let weak = Arc::downgrade(shared);
        self.watchers().push(weak.clone());
        Watch {
            interrupt: self,
            shared: weak,
        }
    }

    fn watchers(&self) -> std::sync::MutexGuard<'_, Vec<Weak<Shared>>> {
        self.inner
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("raised", &self.is_raised())
            .finish()
    }
}

/// Keeps a semaphore registered with an [`Interrupt`] for the duration of a wait.
pub(crate) struct Watch<'a> {
    interrupt: &'a Interrupt,
    shared: Weak<Shared>,
}

impl Drop for Watch<'_> {
    fn drop(&mut self) {
        let mut watchers = self.interrupt.watchers();
        if let Some(pos) = watchers.iter().position(|w| w.ptr_eq(&self.shared)) {
            watchers.swap_remove(pos);
        }
    }
}
