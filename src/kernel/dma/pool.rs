// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Fixed-Slot DMA Pool
//!
//! A coherent allocator over one caller-provided memory region, carved into
//! equally sized slots. Suited to drivers that only ever need a handful of
//! small, fixed-size buffers.
//!
//! The region's bus address is supplied by the caller (identity mapped,
//! IOMMU window, or a device model), and every slot's bus address is
//! `bus_base + offset`.

use core::ptr::NonNull;

use spin::Mutex;

use super::{DmaAllocator, DmaError};
use crate::types::BusAddr;

/// Maximum slots tracked by one pool
pub const MAX_SLOTS: usize = 64;

/// A fixed-slot coherent memory pool
pub struct DmaPool {
    /// Host address of slot 0
    base: NonNull<u8>,

    /// Bus address of slot 0
    bus_base: BusAddr,

    slot_size: usize,
    slots: usize,

    /// Occupancy bitmap, bit N = slot N
    used: Mutex<u64>,
}

// SAFETY: the pool hands out disjoint slots and tracks them under `used`.
unsafe impl Send for DmaPool {}
unsafe impl Sync for DmaPool {}

impl DmaPool {
    /// Create a pool over a raw region
    ///
    /// Slots beyond [`MAX_SLOTS`] are ignored.
    ///
    /// # Safety
    ///
    /// `base..base + len` must be valid, coherent memory reachable by the
    /// device at `bus_base..bus_base + len`, owned by the pool for its whole
    /// lifetime.
    pub unsafe fn new(base: NonNull<u8>, len: usize, bus_base: BusAddr, slot_size: usize) -> Self {
        assert!(slot_size > 0, "DMA pool slot size must be non-zero");
        Self {
            base,
            bus_base,
            slot_size,
            slots: core::cmp::min(len / slot_size, MAX_SLOTS),
            used: Mutex::new(0),
        }
    }

    /// Create a pool over a static region
    pub fn from_static(region: &'static mut [u8], bus_base: BusAddr, slot_size: usize) -> Self {
        let len = region.len();
        // SAFETY: the region is exclusively borrowed forever.
        unsafe { Self::new(NonNull::from(region).cast(), len, bus_base, slot_size) }
    }

    /// Size of each slot in bytes
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Number of slots in the pool
    pub fn capacity(&self) -> usize {
        self.slots
    }

    /// Number of slots currently allocated
    pub fn in_use(&self) -> usize {
        self.used.lock().count_ones() as usize
    }

    /// Resolve a bus address range to the host pointer backing it
    ///
    /// Device models use this to reach buffers the way the device would.
    ///
    /// # Returns
    ///
    /// `None` if any byte of `bus..bus + len` lies outside the pool.
    pub fn translate(&self, bus: BusAddr, len: usize) -> Option<NonNull<u8>> {
        let offset = usize::try_from(bus.checked_sub(self.bus_base)?).ok()?;
        let end = offset.checked_add(len)?;
        if end > self.slots * self.slot_size {
            return None;
        }
        // SAFETY: `offset` lies inside the pool region.
        NonNull::new(unsafe { self.base.as_ptr().add(offset) })
    }

    fn slot_of(&self, cpu: NonNull<u8>) -> usize {
        (cpu.as_ptr() as usize - self.base.as_ptr() as usize) / self.slot_size
    }
}

impl DmaAllocator for DmaPool {
    fn alloc_coherent(&self, size: usize) -> Result<(NonNull<u8>, BusAddr), DmaError> {
        if size == 0 || size > self.slot_size {
            return Err(DmaError);
        }

        let mut used = self.used.lock();
        let slot = (0..self.slots).find(|i| *used & (1u64 << i) == 0).ok_or(DmaError)?;
        *used |= 1u64 << slot;

        let offset = slot * self.slot_size;
        // SAFETY: `slot < slots`, so the offset lies inside the pool region.
        let cpu = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) };
        Ok((cpu, self.bus_base + offset as BusAddr))
    }

    unsafe fn free_coherent(&self, cpu: NonNull<u8>, bus: BusAddr, _size: usize) {
        let slot = self.slot_of(cpu);
        debug_assert_eq!(bus, self.bus_base + (slot * self.slot_size) as BusAddr);

        let mut used = self.used.lock();
        debug_assert!(*used & (1u64 << slot) != 0, "double free of DMA slot {}", slot);
        *used &= !(1u64 << slot);
    }
}
