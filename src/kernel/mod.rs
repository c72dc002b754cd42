// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Driver Core Kernel Services
//!
//! This module contains the kernel-side services the accelerator driver is
//! built from: logging, boot-argument configuration, synchronization, DMA
//! memory, user copies and the device drivers themselves.

// Logging macros
pub mod debug;

// Boot argument parsing
pub mod cmdline;

// Synchronization primitives
pub mod sync;

// DMA-capable memory
pub mod dma;

// User/kernel boundary copies
pub mod usercopy;

// Device drivers
pub mod dev;
