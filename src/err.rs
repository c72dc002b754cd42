// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Driver Error Codes
//!
//! This module provides the operation error taxonomy, the host-binding
//! errors raised while probing, and the errno-style status codes that cross
//! the request surface.

use core::fmt;

use crate::types::Status;

// ============================================================================
// Status Codes
// ============================================================================

/// Success status code
pub const OK: Status = 0;

/// I/O error
pub const EIO: Status = -5;

/// Out of memory
pub const ENOMEM: Status = -12;

/// Bad address
pub const EFAULT: Status = -14;

/// Device or resource busy
pub const EBUSY: Status = -16;

/// No such device
pub const ENODEV: Status = -19;

/// Invalid argument
pub const EINVAL: Status = -22;

/// No data available
pub const ENODATA: Status = -61;

// ============================================================================
// Operation Errors
// ============================================================================

/// Classified failure of one encrypt/decrypt operation
///
/// Every failure is recoverable: the caller may retry the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AesError {
    /// Key buffer could not be allocated, filled or read by the engine
    KeyError,

    /// Input buffer could not be allocated, filled or read by the engine
    InputError,

    /// Output buffer could not be allocated, written by the engine, or
    /// delivered back to the caller
    OutputError,

    /// Device reported an operation already in progress
    DeviceBusy,

    /// Completion was not observed (interrupted or timed-out wait)
    OtherError,
}

impl AesError {
    /// Convert to the status code reported by the request surface
    ///
    /// Only the busy condition survives as its own code; every other
    /// failure is a generic I/O error.
    pub const fn to_status(self) -> Status {
        match self {
            AesError::DeviceBusy => EBUSY,
            _ => EIO,
        }
    }

    /// Get the error name as a string
    pub const fn as_str(self) -> &'static str {
        match self {
            AesError::KeyError => "key error",
            AesError::InputError => "input error",
            AesError::OutputError => "output error",
            AesError::DeviceBusy => "device busy",
            AesError::OtherError => "other error",
        }
    }
}

impl fmt::Display for AesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for accelerator operations
pub type Result<T = ()> = core::result::Result<T, AesError>;

// ============================================================================
// Host Binding Errors
// ============================================================================

/// Fatal failure while binding the device to the driver
///
/// Any of these aborts instance creation after unwinding whatever was
/// already acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    /// Named interrupt resource missing
    IrqNotFound,

    /// Register space could not be mapped
    RegisterSpace(Status),

    /// Named clock resource missing
    ClockNotFound(Status),

    /// Interrupt handler registration refused
    IrqRequest(Status),

    /// Clock could not be enabled
    ClockEnable(Status),
}

impl BindError {
    /// Convert to a status code
    pub const fn as_status(self) -> Status {
        match self {
            BindError::IrqNotFound => ENODATA,
            BindError::RegisterSpace(status)
            | BindError::ClockNotFound(status)
            | BindError::IrqRequest(status)
            | BindError::ClockEnable(status) => status,
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::IrqNotFound => write!(f, "interrupt resource not found"),
            BindError::RegisterSpace(s) => write!(f, "register space not mapped ({})", s),
            BindError::ClockNotFound(s) => write!(f, "clock resource not found ({})", s),
            BindError::IrqRequest(s) => write!(f, "interrupt request failed ({})", s),
            BindError::ClockEnable(s) => write!(f, "clock enable failed ({})", s),
        }
    }
}
