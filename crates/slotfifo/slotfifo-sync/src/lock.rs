//! Interruptible mutual-exclusion lock.
//!
//! A binary [`Semaphore`] guarding an `UnsafeCell`. Unlike `std::sync::Mutex`
//! the wait for the lock can be interrupted or bounded by a deadline.

use crate::interrupt::Interrupt;
use crate::semaphore::{Permit, Semaphore, WaitError};
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::time::Instant;

pub struct Lock<T> {
    gate: Semaphore,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` only happens through a `LockGuard`, and the gate
// holds a single permit, so at most one guard exists at a time.
unsafe impl<T: Send> Send for Lock<T> {}
unsafe impl<T: Send> Sync for Lock<T> {}

/// Exclusive access to the value inside a [`Lock`]. Unlocks on drop.
///
/// The guard hands out `&T` through `Deref`, so sharing it across threads
/// requires `T: Sync`:
///
/// ```compile_fail
/// use slotfifo_sync::LockGuard;
/// use std::cell::Cell;
///
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<LockGuard<'static, Cell<u64>>>();
/// ```
#[must_use = "dropping the guard unlocks immediately"]
pub struct LockGuard<'a, T> {
    lock: &'a Lock<T>,
    _permit: Permit<'a>,
    // Send/Sync follow `&mut T`, not `&Lock<T>`.
    _value: PhantomData<&'a mut T>,
}

impl<T> Lock<T> {
    pub fn new(value: T) -> Self {
        Self {
            gate: Semaphore::new(1),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self, interrupt: &Interrupt) -> Result<LockGuard<'_, T>, WaitError> {
        self.lock_until(interrupt, None)
    }

    pub fn lock_until(
        &self,
        interrupt: &Interrupt,
        deadline: Option<Instant>,
    ) -> Result<LockGuard<'_, T>, WaitError> {
        let permit = self.gate.acquire_until(interrupt, deadline)?;
        Ok(LockGuard::new(self, permit))
    }

    pub fn try_lock(&self) -> Option<LockGuard<'_, T>> {
        self.gate
            .try_acquire()
            .map(|permit| LockGuard::new(self, permit))
    }

    pub fn is_locked(&self) -> bool {
        self.gate.available() == 0
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<'a, T> LockGuard<'a, T> {
    fn new(lock: &'a Lock<T>, permit: Permit<'a>) -> Self {
        Self {
            lock,
            _permit: permit,
            _value: PhantomData,
        }
    }
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: this guard holds the only permit of the gate.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: this guard holds the only permit of the gate.
        unsafe { &mut *self.lock.value.get() }
    }
}
