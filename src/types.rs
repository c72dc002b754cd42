// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Common type aliases used throughout the driver

/// Virtual address type
pub type VAddr = usize;

/// Bus address type (the address a device uses to reach a buffer)
pub type BusAddr = u64;

/// Error code type (negative values indicate errors)
pub type Status = i32;

/// IRQ number type
pub type Irq = u32;

/// Register offset within a register block
pub type RegOffset = usize;
