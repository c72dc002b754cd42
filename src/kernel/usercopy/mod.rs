// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! User/Kernel Boundary Safety
//!
//! This module provides copying between user and kernel space. Every user
//! pointer is validated before it is touched, and a failed copy reports the
//! exact user range that faulted.
//!
//! # Design
//!
//! - **Validation first**: user pointers are checked before access
//! - **Fault isolation**: a bad access becomes a [`CopyFault`], never a panic
//! - **Host supplied**: the hosting kernel implements [`UserCopy`] on top of
//!   its own fault-catching copy routines; [`UserWindow`] covers a single
//!   flat user mapping

use core::fmt;
use core::marker::PhantomData;

use crate::kernel::debug::{log_error, log_trace};
use crate::types::VAddr;

/// ============================================================================
/// User Pointer Types
/// ============================================================================

/// User pointer
///
/// Represents a pointer into user address space. It is never dereferenced
/// directly; only a [`UserCopy`] implementation may access it.
#[repr(transparent)]
pub struct UserPtr<T> {
    ptr: VAddr,
    _phantom: PhantomData<*const T>,
}

impl<T> UserPtr<T> {
    /// Create a new user pointer from a raw address
    pub const fn new(addr: VAddr) -> Self {
        Self {
            ptr: addr,
            _phantom: PhantomData,
        }
    }

    /// Get the raw address
    pub const fn addr(&self) -> VAddr {
        self.ptr
    }

    /// Check if the pointer is null
    pub const fn is_null(&self) -> bool {
        self.ptr == 0
    }

    /// Reinterpret as a pointer to another type
    pub const fn cast<U>(self) -> UserPtr<U> {
        UserPtr::new(self.ptr)
    }
}

impl<T> Clone for UserPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for UserPtr<T> {}

impl<T> PartialEq for UserPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for UserPtr<T> {}

impl<T> fmt::Debug for UserPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserPtr({:#x})", self.ptr)
    }
}

// SAFETY: a user pointer is an address, never dereferenced by its holder.
unsafe impl<T> Send for UserPtr<T> {}
unsafe impl<T> Sync for UserPtr<T> {}

/// A user access that could not be completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyFault {
    /// First user address of the failed access
    pub addr: VAddr,

    /// Length of the failed access
    pub len: usize,
}

impl fmt::Display for CopyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user access fault at {:#x} (len {})", self.addr, self.len)
    }
}

/// ============================================================================
/// Copy Operations
/// ============================================================================

/// Copies across the user/kernel boundary
pub trait UserCopy {
    /// Copy `dst.len()` bytes from user space into `dst`
    fn copy_from_user(&self, dst: &mut [u8], src: UserPtr<u8>) -> Result<(), CopyFault>;

    /// Copy `src` into user space at `dst`
    fn copy_to_user(&self, dst: UserPtr<u8>, src: &[u8]) -> Result<(), CopyFault>;
}

impl<U: UserCopy + ?Sized> UserCopy for &U {
    fn copy_from_user(&self, dst: &mut [u8], src: UserPtr<u8>) -> Result<(), CopyFault> {
        (**self).copy_from_user(dst, src)
    }

    fn copy_to_user(&self, dst: UserPtr<u8>, src: &[u8]) -> Result<(), CopyFault> {
        (**self).copy_to_user(dst, src)
    }
}

/// A flat user mapping at `base..base + len`
///
/// Accesses are checked against the window bounds before the copy, which is
/// all the fault handling a mapping that is known to be resident needs.
#[derive(Debug, Clone, Copy)]
pub struct UserWindow {
    base: VAddr,
    len: usize,
}

impl UserWindow {
    /// Create a window over resident user memory
    ///
    /// # Safety
    ///
    /// `base..base + len` must stay mapped, readable and writable for as
    /// long as the window is used, and must not overlap kernel buffers
    /// passed to the copy routines.
    pub const unsafe fn new(base: VAddr, len: usize) -> Self {
        Self { base, len }
    }

    /// Check that `addr..addr + len` lies inside the window
    pub fn contains(&self, addr: VAddr, len: usize) -> bool {
        if addr == 0 {
            return false;
        }
        match (addr.checked_sub(self.base), self.base.checked_add(self.len)) {
            (Some(offset), Some(_)) => offset
                .checked_add(len)
                .map_or(false, |end| end <= self.len),
            _ => false,
        }
    }

    fn check(&self, op: &str, addr: VAddr, len: usize) -> Result<(), CopyFault> {
        if self.contains(addr, len) {
            return Ok(());
        }
        log_error!("{}: range not in user window {:#x} len={}", op, addr, len);
        Err(CopyFault { addr, len })
    }
}

impl UserCopy for UserWindow {
    fn copy_from_user(&self, dst: &mut [u8], src: UserPtr<u8>) -> Result<(), CopyFault> {
        self.check("copy_from_user", src.addr(), dst.len())?;

        // SAFETY: the range was validated against the resident window.
        unsafe {
            core::ptr::copy_nonoverlapping(src.addr() as *const u8, dst.as_mut_ptr(), dst.len());
        }

        log_trace!("copy_from_user: src={:#x} len={}", src.addr(), dst.len());
        Ok(())
    }

    fn copy_to_user(&self, dst: UserPtr<u8>, src: &[u8]) -> Result<(), CopyFault> {
        self.check("copy_to_user", dst.addr(), src.len())?;

        // SAFETY: the range was validated against the resident window.
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr(), dst.addr() as *mut u8, src.len());
        }

        log_trace!("copy_to_user: dst={:#x} len={}", dst.addr(), src.len());
        Ok(())
    }
}
