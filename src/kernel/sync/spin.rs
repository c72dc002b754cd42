// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Interrupt-Safe Spinlock
//!
//! A spinlock that may be taken both from a blocking context and from an
//! interrupt handler. Acquiring it first saves and masks local interrupts
//! through the installed [`InterruptMask`], so an interrupt handler on the
//! same CPU can never spin on a lock its own CPU already holds. The state is
//! restored after the lock is released.
//!
//! Without an installed mask (hosted builds, device models) the lock is a
//! plain spinlock.

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use ::spin::mutex::{Mutex, MutexGuard};
use ::spin::Once;

/// Local interrupt masking provided by the architecture layer
pub trait InterruptMask: Sync {
    /// Disable local interrupts, returning the previous state
    fn save_and_disable(&self) -> usize;

    /// Restore a state returned by `save_and_disable`
    fn restore(&self, state: usize);
}

static INTERRUPT_MASK: Once<&'static dyn InterruptMask> = Once::new();

/// Install the architecture's interrupt mask
///
/// Only the first call has an effect. Returns `false` if a mask was already
/// installed.
pub fn install_interrupt_mask(mask: &'static dyn InterruptMask) -> bool {
    let mut installed = false;
    INTERRUPT_MASK.call_once(|| {
        installed = true;
        mask
    });
    installed
}

#[inline]
fn irq_save() -> Option<usize> {
    INTERRUPT_MASK.get().map(|mask| mask.save_and_disable())
}

#[inline]
fn irq_restore(state: Option<usize>) {
    if let (Some(mask), Some(state)) = (INTERRUPT_MASK.get(), state) {
        mask.restore(state);
    }
}

/// A spinlock that masks local interrupts while held
pub struct IrqSpinLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqSpinLock<T> {
    /// Create a new lock protecting `data`
    pub const fn new(data: T) -> Self {
        Self {
            inner: Mutex::new(data),
        }
    }

    /// Acquire the lock, spinning until it becomes available
    pub fn lock(&self) -> IrqSpinLockGuard<'_, T> {
        let state = irq_save();
        IrqSpinLockGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            state,
        }
    }

    /// Try to acquire the lock without spinning
    pub fn try_lock(&self) -> Option<IrqSpinLockGuard<'_, T>> {
        let state = irq_save();
        match self.inner.try_lock() {
            Some(guard) => Some(IrqSpinLockGuard {
                guard: ManuallyDrop::new(guard),
                state,
            }),
            None => {
                irq_restore(state);
                None
            }
        }
    }

    /// Check whether the lock is currently held
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Consume the lock, returning the protected data
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// RAII guard for an IrqSpinLock
pub struct IrqSpinLockGuard<'a, T> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
    state: Option<usize>,
}

impl<T> Drop for IrqSpinLockGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the guard is dropped exactly once, here.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        irq_restore(self.state);
    }
}

impl<T> Deref for IrqSpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqSpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
