//! Cooperative cancellation

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Cloneable cancellation handle shared between the driver and a signal
/// handler.
///
/// The engine polls it between file operations; the scheduler sleeps on it
/// between passes so a stop request ends the wait immediately.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake every waiter.
    pub fn stop(&self) {
        let (lock, condvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        condvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for up to `timeout`, returning early if a stop is requested.
    ///
    /// Returns `true` when the token was stopped. A timeout too large to
    /// represent as a deadline waits until the token is stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, condvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(deadline) = Instant::now().checked_add(timeout) else {
            while !*stopped {
                stopped = condvar.wait(stopped).unwrap_or_else(PoisonError::into_inner);
            }
            return true;
        };

        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            stopped = condvar
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        *stopped
    }
}
