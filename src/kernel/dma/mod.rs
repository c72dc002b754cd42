// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! DMA-Capable Memory
//!
//! Coherent buffers shared between the CPU and a bus-mastering device. Each
//! buffer carries two addresses: the host pointer the CPU dereferences and
//! the bus address the device is programmed with.
//!
//! # Design
//!
//! - **All or nothing**: a [`DmaBuffer`] exists only with both addresses
//!   valid; a failed allocation leaves nothing behind to free
//! - **Freed exactly once**: the buffer is released when it is dropped, so
//!   early returns unwind in reverse acquisition order
//! - **Zero-filled**: contents are cleared on allocation so the CPU never
//!   reads uninitialized memory

use alloc::sync::Arc;
use core::fmt;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use crate::types::BusAddr;

pub mod pool;

pub use pool::DmaPool;

/// Coherent allocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaError;

impl fmt::Display for DmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("coherent DMA allocation failed")
    }
}

/// The host's coherent-memory allocator
pub trait DmaAllocator: Send + Sync {
    /// Allocate `size` bytes of coherent memory
    ///
    /// # Returns
    ///
    /// The host pointer and the bus address of the same memory, or
    /// `DmaError` under memory pressure.
    fn alloc_coherent(&self, size: usize) -> Result<(NonNull<u8>, BusAddr), DmaError>;

    /// Release memory obtained from `alloc_coherent`
    ///
    /// # Safety
    ///
    /// `cpu`, `bus` and `size` must come from one successful
    /// `alloc_coherent` call on this allocator, and each allocation may be
    /// freed only once.
    unsafe fn free_coherent(&self, cpu: NonNull<u8>, bus: BusAddr, size: usize);
}

impl<A: DmaAllocator + ?Sized> DmaAllocator for &A {
    fn alloc_coherent(&self, size: usize) -> Result<(NonNull<u8>, BusAddr), DmaError> {
        (**self).alloc_coherent(size)
    }

    unsafe fn free_coherent(&self, cpu: NonNull<u8>, bus: BusAddr, size: usize) {
        (**self).free_coherent(cpu, bus, size)
    }
}

impl<A: DmaAllocator + ?Sized> DmaAllocator for Arc<A> {
    fn alloc_coherent(&self, size: usize) -> Result<(NonNull<u8>, BusAddr), DmaError> {
        (**self).alloc_coherent(size)
    }

    unsafe fn free_coherent(&self, cpu: NonNull<u8>, bus: BusAddr, size: usize) {
        (**self).free_coherent(cpu, bus, size)
    }
}

/// An owned coherent buffer
///
/// Freed back to its allocator on drop.
pub struct DmaBuffer<'a, A: DmaAllocator + ?Sized> {
    allocator: &'a A,
    cpu: NonNull<u8>,
    bus: BusAddr,
    size: usize,
}

impl<'a, A: DmaAllocator + ?Sized> DmaBuffer<'a, A> {
    /// Allocate a zero-filled buffer of `size` bytes
    pub fn allocate(allocator: &'a A, size: usize) -> Result<Self, DmaError> {
        let (cpu, bus) = allocator.alloc_coherent(size)?;

        // SAFETY: the allocator handed out `size` writable bytes at `cpu`.
        unsafe { cpu.as_ptr().write_bytes(0, size) };

        Ok(Self {
            allocator,
            cpu,
            bus,
            size,
        })
    }

    /// Get the bus address to program into the device
    pub fn bus_addr(&self) -> BusAddr {
        self.bus
    }

    /// Get the host pointer
    pub fn cpu_ptr(&self) -> NonNull<u8> {
        self.cpu
    }

    /// Length of the buffer in bytes
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the buffer has zero length
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get a slice of the buffer contents
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `size` initialized bytes live at `cpu` until drop.
        unsafe { core::slice::from_raw_parts(self.cpu.as_ptr(), self.size) }
    }

    /// Get a mutable slice of the buffer contents
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` makes this the only CPU view.
        unsafe { core::slice::from_raw_parts_mut(self.cpu.as_ptr(), self.size) }
    }

    /// Give up the guard without freeing the memory
    ///
    /// Used when a device may still be accessing the buffer.
    pub fn into_raw(self) -> RawDmaBuffer {
        let this = ManuallyDrop::new(self);
        RawDmaBuffer {
            cpu: this.cpu,
            bus: this.bus,
            size: this.size,
        }
    }
}

impl<A: DmaAllocator + ?Sized> Drop for DmaBuffer<'_, A> {
    fn drop(&mut self) {
        // SAFETY: this buffer owns exactly one successful allocation.
        unsafe { self.allocator.free_coherent(self.cpu, self.bus, self.size) };
    }
}

/// A coherent allocation with no owner to free it
///
/// Leaks unless handed back through [`RawDmaBuffer::free`].
#[derive(Debug)]
pub struct RawDmaBuffer {
    cpu: NonNull<u8>,
    bus: BusAddr,
    size: usize,
}

// SAFETY: only the addresses are carried; nothing dereferences `cpu`.
unsafe impl Send for RawDmaBuffer {}

impl RawDmaBuffer {
    pub fn bus_addr(&self) -> BusAddr {
        self.bus
    }

    /// Return the memory to `allocator`
    ///
    /// # Safety
    ///
    /// `allocator` must be the one the buffer came from, and no device may
    /// still be accessing it.
    pub unsafe fn free<A: DmaAllocator + ?Sized>(self, allocator: &A) {
        allocator.free_coherent(self.cpu, self.bus, self.size)
    }
}

impl<A: DmaAllocator + ?Sized> fmt::Debug for DmaBuffer<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaBuffer")
            .field("cpu", &self.cpu)
            .field("bus", &format_args!("{:#x}", self.bus))
            .field("size", &self.size)
            .finish()
    }
}
