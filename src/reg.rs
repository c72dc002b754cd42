// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Register Access Module
//!
//! Raw 32-bit MMIO access plus the [`RegisterIo`] seam the device drivers
//! program through, so a register block can be real memory-mapped I/O or a
//! device model.

use crate::types::{RegOffset, VAddr};

/// Read a 32-bit register
///
/// # Safety
///
/// `addr` must be a mapped, 4-byte aligned device register.
#[inline]
pub unsafe fn read_reg32(addr: VAddr) -> u32 {
    core::ptr::read_volatile(addr as *const u32)
}

/// Write a 32-bit register
///
/// # Safety
///
/// `addr` must be a mapped, 4-byte aligned device register.
#[inline]
pub unsafe fn write_reg32(addr: VAddr, val: u32) {
    core::ptr::write_volatile(addr as *mut u32, val)
}

/// Word-granular access to one register block
///
/// Accesses must never block or panic. Drivers check [`RegisterIo::span`]
/// once when binding instead of on every access.
pub trait RegisterIo: Send {
    /// Number of bytes of register space behind this block
    fn span(&self) -> usize;

    /// Read the 32-bit word at `offset`
    fn read32(&self, offset: RegOffset) -> u32;

    /// Write the 32-bit word at `offset`
    fn write32(&self, offset: RegOffset, value: u32);
}

/// A memory-mapped register block
#[derive(Debug)]
pub struct MmioRegion {
    base: VAddr,
    len: usize,
}

impl MmioRegion {
    /// Wrap an already mapped register block
    ///
    /// # Safety
    ///
    /// `base..base + len` must stay mapped as device memory for the lifetime
    /// of the returned value, and nothing else may alias it.
    pub const unsafe fn new(base: VAddr, len: usize) -> Self {
        Self { base, len }
    }

    /// Get the virtual base address
    pub const fn base(&self) -> VAddr {
        self.base
    }

    /// Get the mapped length in bytes
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the mapping is empty
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl MmioRegion {
    #[inline]
    fn contains(&self, offset: RegOffset) -> bool {
        offset.checked_add(4).map_or(false, |end| end <= self.len)
    }
}

impl RegisterIo for MmioRegion {
    fn span(&self) -> usize {
        self.len
    }

    /// Out-of-range reads float high, like an unclaimed bus cycle
    #[inline]
    fn read32(&self, offset: RegOffset) -> u32 {
        if !self.contains(offset) {
            return u32::MAX;
        }
        // SAFETY: the range check above keeps the access inside the mapping
        // promised by `MmioRegion::new`.
        unsafe { read_reg32(self.base + offset) }
    }

    /// Out-of-range writes are dropped
    #[inline]
    fn write32(&self, offset: RegOffset, value: u32) {
        if !self.contains(offset) {
            return;
        }
        // SAFETY: see `read32`.
        unsafe { write_reg32(self.base + offset, value) }
    }
}
