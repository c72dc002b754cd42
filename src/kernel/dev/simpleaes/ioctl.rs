// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! SimpleAES Request Surface
//!
//! Two ioctl commands, `IOCTL_ENCRYPT` and `IOCTL_DECRYPT`, both taking a
//! user pointer to an [`IoctlData`] naming the user key, input and output
//! blocks. Encoded with the generic `_IOWR` layout.

use core::mem::size_of;

use super::ops::OperationIo;
use super::{OpMode, SimpleAes};
use crate::err::{EFAULT, EINVAL, OK};
use crate::kernel::debug::{log_debug, log_error};
use crate::kernel::dma::DmaAllocator;
use crate::kernel::sync::WaitQueue;
use crate::kernel::usercopy::{CopyFault, UserCopy, UserPtr};
use crate::reg::RegisterIo;
use crate::types::{Status, VAddr};

// ============================================================================
// Command Encoding
// ============================================================================

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;

const IOC_SIZEMASK: u32 = (1 << 14) - 1;

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

/// Encode a read/write ioctl command
pub const fn iowr(ty: u8, nr: u8, size: usize) -> u32 {
    ((IOC_READ | IOC_WRITE) << IOC_DIRSHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | (((size as u32) & IOC_SIZEMASK) << IOC_SIZESHIFT)
}

pub const IOCTL_MAGIC: u8 = b'z';

/// Encrypt one block
pub const IOCTL_ENCRYPT: u32 = iowr(IOCTL_MAGIC, 1, size_of::<*const IoctlData>());

/// Decrypt one block
pub const IOCTL_DECRYPT: u32 = iowr(IOCTL_MAGIC, 2, size_of::<*const IoctlData>());

// ============================================================================
// Request Data
// ============================================================================

/// Argument block of both commands
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoctlData {
    pub key_ptr: VAddr,
    pub input_ptr: VAddr,
    pub output_ptr: VAddr,
}

const WORD: usize = size_of::<VAddr>();

/// Size of [`IoctlData`] in bytes
pub const IOCTL_DATA_SIZE: usize = size_of::<IoctlData>();

impl IoctlData {
    /// Decode the native-endian in-memory layout
    pub fn from_bytes(bytes: &[u8; IOCTL_DATA_SIZE]) -> Self {
        let word = |i: usize| {
            let mut raw = [0u8; WORD];
            raw.copy_from_slice(&bytes[i * WORD..(i + 1) * WORD]);
            VAddr::from_ne_bytes(raw)
        };
        Self {
            key_ptr: word(0),
            input_ptr: word(1),
            output_ptr: word(2),
        }
    }

    /// Encode to the native-endian in-memory layout
    pub fn to_bytes(&self) -> [u8; IOCTL_DATA_SIZE] {
        let mut bytes = [0u8; IOCTL_DATA_SIZE];
        for (i, ptr) in [self.key_ptr, self.input_ptr, self.output_ptr].iter().enumerate() {
            bytes[i * WORD..(i + 1) * WORD].copy_from_slice(&ptr.to_ne_bytes());
        }
        bytes
    }

    /// Copy the argument block in from user space
    pub fn read_from<U: UserCopy + ?Sized>(
        user: &U,
        arg: UserPtr<IoctlData>,
    ) -> Result<Self, CopyFault> {
        let mut bytes = [0u8; IOCTL_DATA_SIZE];
        user.copy_from_user(&mut bytes, arg.cast())?;
        Ok(Self::from_bytes(&bytes))
    }
}

/// One user request: every block access crosses the user boundary
pub struct UserRequest<'a, U: ?Sized> {
    user: &'a U,
    data: IoctlData,
}

impl<'a, U: UserCopy + ?Sized> UserRequest<'a, U> {
    pub fn new(user: &'a U, data: IoctlData) -> Self {
        Self { user, data }
    }
}

impl<U: UserCopy + ?Sized> OperationIo for UserRequest<'_, U> {
    fn read_key(&mut self, dst: &mut [u8]) -> Result<(), CopyFault> {
        self.user.copy_from_user(dst, UserPtr::new(self.data.key_ptr))
    }

    fn read_input(&mut self, dst: &mut [u8]) -> Result<(), CopyFault> {
        self.user.copy_from_user(dst, UserPtr::new(self.data.input_ptr))
    }

    fn write_output(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        self.user.copy_to_user(UserPtr::new(self.data.output_ptr), src)
    }
}

impl<R, A, W> SimpleAes<R, A, W>
where
    R: RegisterIo,
    A: DmaAllocator,
    W: WaitQueue,
{
    /// Handle one ioctl
    ///
    /// # Returns
    ///
    /// - `OK` on success
    /// - `EFAULT` if the argument block cannot be read
    /// - `EINVAL` for an unknown command
    /// - `EBUSY` if the device is busy, `EIO` for any other failure
    pub fn ioctl<U: UserCopy + ?Sized>(&self, cmd: u32, arg: VAddr, user: &U) -> Status {
        let mode = match cmd {
            IOCTL_ENCRYPT => OpMode::Encrypt,
            IOCTL_DECRYPT => OpMode::Decrypt,
            _ => {
                log_debug!("unknown ioctl {:#x}", cmd);
                return EINVAL;
            }
        };

        let data = match IoctlData::read_from(user, UserPtr::new(arg)) {
            Ok(data) => data,
            Err(fault) => {
                log_error!("ioctl {:#x}: {}", cmd, fault);
                return EFAULT;
            }
        };

        let mut request = UserRequest::new(user, data);
        match self.run_operation(mode, &mut request) {
            Ok(()) => OK,
            Err(err) => err.to_status(),
        }
    }
}
