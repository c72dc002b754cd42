// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Completion Channel
//!
//! A single-slot mailbox connecting an interrupt producer to one blocking
//! consumer.
//!
//! # Design
//!
//! - **Overwrite**: `send` replaces any unconsumed value (last write wins)
//! - **Consume once**: `receive` takes the value and empties the slot
//! - **Non-blocking producer**: `send` is callable from interrupt context
//! - **No queueing**: this is not a queue; at most one value is pending
//!
//! # Usage
//!
//! ```rust,ignore
//! let channel = CompletionChannel::new(CondvarWaitQueue::new());
//!
//! // Interrupt handler
//! channel.send(Ok(()));
//!
//! // Calling thread
//! let result = channel.receive()?;
//! ```

use core::fmt;
use core::time::Duration;

use super::spin::IrqSpinLock;
use super::wait_queue::{WaitQueue, WaitStatus};

/// Why `receive` returned without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// Woken (spuriously or by interruption) with nothing pending
    NoResult,

    /// The timeout expired with nothing pending
    TimedOut,
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecvError::NoResult => f.write_str("woken without a result"),
            RecvError::TimedOut => f.write_str("timed out waiting for a result"),
        }
    }
}

/// Single-slot, overwrite-last-value notification channel
pub struct CompletionChannel<T, W> {
    slot: IrqSpinLock<Option<T>>,
    waiters: W,
}

impl<T: Send, W: WaitQueue> CompletionChannel<T, W> {
    /// Create an empty channel sleeping on `waiters`
    pub const fn new(waiters: W) -> Self {
        Self {
            slot: IrqSpinLock::new(None),
            waiters,
        }
    }

    /// Post a value, replacing any value not yet received
    ///
    /// Never blocks.
    pub fn send(&self, value: T) {
        *self.slot.lock() = Some(value);
        self.waiters.wake_all();
    }

    /// Block until a value is posted, then take it
    ///
    /// If the wait ends without a pending value (interrupted wait, spurious
    /// wake) this returns [`RecvError::NoResult`] instead of blocking again.
    pub fn receive(&self) -> Result<T, RecvError> {
        self.receive_within(None)
    }

    /// Like [`receive`](Self::receive) but gives up after `timeout`
    pub fn receive_timeout(&self, timeout: Duration) -> Result<T, RecvError> {
        self.receive_within(Some(timeout))
    }

    /// Receive with an optional bound on the wait
    pub fn receive_within(&self, timeout: Option<Duration>) -> Result<T, RecvError> {
        let status = self
            .waiters
            .block_until(&|| self.slot.lock().is_some(), timeout);

        let pending = self.slot.lock().take();
        match pending {
            Some(value) => Ok(value),
            None if status == WaitStatus::TimedOut => Err(RecvError::TimedOut),
            None => Err(RecvError::NoResult),
        }
    }

    /// Take the pending value, if any, without blocking
    pub fn try_receive(&self) -> Option<T> {
        self.slot.lock().take()
    }

    /// Discard any pending value
    pub fn reset(&self) {
        self.slot.lock().take();
    }

    /// Check whether a value is pending
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}
