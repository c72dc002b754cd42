// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! SimpleAES Accelerator Driver Core
//!
//! Control logic for the SimpleAES memory-mapped block cipher engine. The
//! cipher itself runs in hardware; this crate marshals DMA buffers, programs
//! the register file, waits for the completion interrupt and classifies
//! errors.
//!
//! # Layout
//!
//! - [`reg`], [`bits`]: raw MMIO access and bit-field helpers
//! - [`kernel::sync`]: interrupt-safe spin lock, wait queue, completion channel
//! - [`kernel::dma`]: coherent DMA buffers and a slot pool
//! - [`kernel::usercopy`]: user/kernel boundary copies
//! - [`kernel::dev::simpleaes`]: the device instance, orchestrator,
//!   interrupt handler and ioctl surface
//! - [`platform`]: what the host must provide when binding the device
//!
//! # Usage
//!
//! ```rust,ignore
//! let driver = SimpleAesDriver::probe(pdev, dma, CondvarWaitQueue::new(), config)?;
//! let ciphertext = driver.device().encrypt_block(&key, &plaintext)?;
//! driver.remove();
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod bits;
pub mod err;
pub mod platform;
pub mod reg;
pub mod types;

pub mod kernel;

// Re-exports
pub use err::{AesError, BindError, Result};
pub use kernel::dev::simpleaes::{
    Block, OpMode, SimpleAes, SimpleAesConfig, SimpleAesDriver, BLOCK_SIZE,
};
