// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Synchronization Primitives
//!
//! This module provides the synchronization primitives shared between a
//! driver's calling context and its interrupt handler.
//!
//! # Primitives
//!
//! - **IrqSpinLock**: Short critical sections, safe from interrupt context
//! - **Wait Queue**: Where a blocking caller sleeps until a condition holds
//! - **Completion Channel**: Single-slot mailbox from interrupt to caller
//!
//! # Design
//!
//! Only the wait queue may sleep. The spin lock and the producer side of the
//! completion channel never block, so both are usable from an interrupt
//! handler.

pub mod completion;
pub mod spin;
pub mod wait_queue;

// Re-exports
pub use self::completion::*;
pub use self::spin::*;
pub use self::wait_queue::*;
