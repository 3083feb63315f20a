//! Counting semaphore with interruptible, deadline-aware waits.
//!
//! # Protocol
//!
//! **Acquire (down):**
//! 1. If a permit is available, take it and return (never observes the interrupt)
//! 2. Otherwise register with the interrupt token and park on the condvar
//! 3. On wakeup: interrupt raised → give up; deadline passed → give up;
//!    permit available → take it
//!
//! **Release (up):**
//! 1. Add one permit
//! 2. Wake one parked waiter
//!
//! A waiter that gives up while a permit is available passes the wakeup on to
//! the next waiter, so a released permit is never stranded behind a cancelled
//! wait.

use crate::interrupt::Interrupt;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::trace;

/// Reason a blocking wait ended without acquiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("wait was interrupted")]
    Interrupted,

    #[error("wait deadline elapsed")]
    TimedOut,
}

/// State shared between a semaphore and the interrupt tokens watching it.
pub(crate) struct Shared {
    permits: Mutex<usize>,
    pub(crate) cond: Condvar,
}

impl Shared {
    /// The permit count is a plain integer, so a poisoned lock is still consistent.
    #[inline]
    pub(crate) fn lock_permits(&self) -> MutexGuard<'_, usize> {
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A counting semaphore.
///
/// Permits are handed out as RAII [`Permit`] guards: dropping a guard returns
/// the permit, [`Permit::forget`] consumes it for good. Error paths therefore
/// restore whatever they provisionally acquired without extra bookkeeping.
pub struct Semaphore {
    shared: Arc<Shared>,
}

/// One acquired permit. Returned to its semaphore on drop.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                permits: Mutex::new(permits),
                cond: Condvar::new(),
            }),
        }
    }

    /// Number of permits currently available.
    ///
    /// A snapshot: it may be stale as soon as it is returned.
    pub fn available(&self) -> usize {
        *self.shared.lock_permits()
    }

    /// Takes a permit if one is available, without blocking.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut permits = self.shared.lock_permits();
        if *permits == 0 {
            return None;
        }
        *permits -= 1;
        Some(Permit { semaphore: self })
    }

    /// Blocks until a permit is available or `interrupt` is raised.
    pub fn acquire(&self, interrupt: &Interrupt) -> Result<Permit<'_>, WaitError> {
        self.acquire_until(interrupt, None)
    }

    /// Blocks until a permit is available, `interrupt` is raised, or `deadline` passes.
    ///
    /// # Errors
    /// - [`WaitError::Interrupted`] if the token was raised while waiting
    /// - [`WaitError::TimedOut`] if the deadline passed first
    ///
    /// In both cases the permit count is unchanged.
    pub fn acquire_until(
        &self,
        interrupt: &Interrupt,
        deadline: Option<Instant>,
    ) -> Result<Permit<'_>, WaitError> {
        let mut permits = self.shared.lock_permits();
        if *permits > 0 {
            *permits -= 1;
            return Ok(Permit { semaphore: self });
        }

        let _watch = interrupt.watch(&self.shared);
        loop {
            if interrupt.is_raised() {
                return Err(self.abandon(&permits, WaitError::Interrupted));
            }
            if *permits > 0 {
                *permits -= 1;
                return Ok(Permit { semaphore: self });
            }

            permits = match deadline {
                None => self
                    .shared
                    .cond
                    .wait(permits)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(self.abandon(&permits, WaitError::TimedOut));
                    }
                    self.shared
                        .cond
                        .wait_timeout(permits, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Adds one permit and wakes one waiter.
    pub fn release(&self) {
        *self.shared.lock_permits() += 1;
        self.shared.cond.notify_one();
    }

    #[inline]
    fn abandon(&self, permits: &usize, reason: WaitError) -> WaitError {
        // We may have swallowed the notify_one meant for a permit we are not
        // going to take.
        if *permits > 0 {
            self.shared.cond.notify_one();
        }
        trace!(?reason, available = *permits, "semaphore wait abandoned");
        reason
    }
}

impl Permit<'_> {
    /// Consumes the permit without returning it to the semaphore.
    pub fn forget(self) {
        mem::forget(self);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn permits_count_down_and_back_up() {
        let sem = Semaphore::new(2);
        let interrupt = Interrupt::new();

        let a = sem.acquire(&interrupt).unwrap();
        let b = sem.acquire(&interrupt).unwrap();
        assert_eq!(sem.available(), 0);
        assert!(sem.try_acquire().is_none());

        drop(a);
        assert_eq!(sem.available(), 1);
        b.forget();
        assert_eq!(sem.available(), 1);
    }

    #[test]
    fn release_wakes_a_blocked_waiter() {
        let sem = Semaphore::new(0);
        let interrupt = Interrupt::new();
        let (tx, rx) = mpsc::channel();

        thread::scope(|s| {
            s.spawn(|| {
                let permit = sem.acquire(&interrupt).unwrap();
                permit.forget();
                tx.send(()).unwrap();
            });

            assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
            sem.release();
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        });

        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn interrupt_wakes_a_blocked_waiter_without_changing_the_count() {
        let sem = Semaphore::new(0);
        let interrupt = Interrupt::new();

        thread::scope(|s| {
            let waiter = s.spawn(|| sem.acquire(&interrupt).map(Permit::forget));
            thread::sleep(Duration::from_millis(20));
            interrupt.raise();
            assert_eq!(waiter.join().unwrap(), Err(WaitError::Interrupted));
        });

        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn raised_interrupt_does_not_block_the_fast_path() {
        let sem = Semaphore::new(1);
        let interrupt = Interrupt::new();
        interrupt.raise();

        let permit = sem.acquire(&interrupt).unwrap();
        assert_eq!(
            sem.acquire(&interrupt).map(Permit::forget),
            Err(WaitError::Interrupted)
        );
        drop(permit);
        assert_eq!(sem.available(), 1);
    }

    #[test]
    fn deadline_expires() {
        let sem = Semaphore::new(0);
        let interrupt = Interrupt::new();
        let deadline = Instant::now() + Duration::from_millis(10);

        let result = sem.acquire_until(&interrupt, Some(deadline)).map(Permit::forget);
        assert_eq!(result, Err(WaitError::TimedOut));
        assert!(Instant::now() >= deadline);
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn cancelled_waiter_passes_the_wakeup_on() {
        let sem = Semaphore::new(0);
        let doomed = Interrupt::new();
        let patient = Interrupt::new();
        let (tx, rx) = mpsc::channel();

        thread::scope(|s| {
            let cancelled = s.spawn(|| sem.acquire(&doomed).map(Permit::forget));
            s.spawn(|| {
                sem.acquire(&patient).unwrap().forget();
                tx.send(()).unwrap();
            });
            thread::sleep(Duration::from_millis(20));

            doomed.raise();
            assert_eq!(cancelled.join().unwrap(), Err(WaitError::Interrupted));

            sem.release();
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        });
    }
}
