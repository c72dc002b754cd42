// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Wait Queue
//!
//! This module provides the wait queue abstraction a blocking caller sleeps
//! on. A hosting kernel implements [`WaitQueue`] on top of its scheduler;
//! hosted builds get [`CondvarWaitQueue`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let wq = CondvarWaitQueue::new();
//!
//! // Block until the flag is raised (no timeout)
//! let status = wq.block_until(&|| flag.load(Ordering::Acquire), None);
//!
//! // From the producer, after raising the flag
//! wq.wake_all();
//! ```

use core::time::Duration;

/// Why a blocked thread resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The condition held when the thread resumed
    Woken,

    /// The wait was interrupted (e.g. by a signal) before the condition held
    Interrupted,

    /// The timeout expired before the condition held
    TimedOut,
}

/// A queue of threads waiting for a condition
pub trait WaitQueue: Send + Sync {
    /// Block the calling thread until `ready` returns true
    ///
    /// `ready` must be cheap and must not block. Implementations must
    /// evaluate it in a way that cannot miss a `wake_all` issued after the
    /// condition became true.
    ///
    /// # Arguments
    ///
    /// * `ready` - Condition to wait for
    /// * `timeout` - Maximum time to wait (`None` = infinite)
    fn block_until(&self, ready: &dyn Fn() -> bool, timeout: Option<Duration>) -> WaitStatus;

    /// Wake every thread blocked on this queue
    ///
    /// Callable from interrupt context.
    fn wake_all(&self);
}

impl<Q: WaitQueue + ?Sized> WaitQueue for &Q {
    fn block_until(&self, ready: &dyn Fn() -> bool, timeout: Option<Duration>) -> WaitStatus {
        (**self).block_until(ready, timeout)
    }

    fn wake_all(&self) {
        (**self).wake_all()
    }
}

#[cfg(any(test, feature = "std"))]
pub use self::condvar::CondvarWaitQueue;

#[cfg(any(test, feature = "std"))]
mod condvar {
    use super::{WaitQueue, WaitStatus};
    use std::sync::{Condvar, Mutex, PoisonError};
    use std::time::{Duration, Instant};

    /// Wait queue backed by a condition variable
    ///
    /// The condition is evaluated while holding the queue mutex, and
    /// `wake_all` takes the same mutex, so a wake issued between the check
    /// and the sleep is never lost.
    #[derive(Debug, Default)]
    pub struct CondvarWaitQueue {
        generation: Mutex<u64>,
        cond: Condvar,
    }

    impl CondvarWaitQueue {
        /// Create an empty wait queue
        pub const fn new() -> Self {
            Self {
                generation: Mutex::new(0),
                cond: Condvar::new(),
            }
        }
    }

    impl WaitQueue for CondvarWaitQueue {
        fn block_until(&self, ready: &dyn Fn() -> bool, timeout: Option<Duration>) -> WaitStatus {
            let deadline = timeout.map(|t| Instant::now() + t);
            let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);

            loop {
                if ready() {
                    return WaitStatus::Woken;
                }

                generation = match deadline {
                    None => self.cond.wait(generation).unwrap_or_else(PoisonError::into_inner),
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            return WaitStatus::TimedOut;
                        }
                        self.cond
                            .wait_timeout(generation, deadline - now)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0
                    }
                };
            }
        }

        fn wake_all(&self) {
            let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
            *generation = generation.wrapping_add(1);
            self.cond.notify_all();
        }
    }
}
