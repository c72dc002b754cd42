// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! SimpleAES Register File
//!
//! # Register Map
//!
//! | Offset | Name | Description                                   |
//! |--------|------|-----------------------------------------------|
//! | 0x00   | CTRL | OP (bit 0), IE (bit 1)                        |
//! | 0x04   | STAT | BUSY (bit 0), IRQ pending (bit 1), ERR (2-3)  |
//! | 0x08   | IRQ  | COMPLETE (bit 0), ERR (bit 1), write-to-clear |
//! | 0x0C   | KAR  | Key buffer bus address                        |
//! | 0x10   | IAR  | Input buffer bus address                      |
//! | 0x14   | OAR  | Output buffer bus address                     |
//!
//! A [`RegisterFile`] is only ever reached through the device's register
//! lock, so writes take `&mut self`.

use crate::bits::{field_get, field_mask, field_set};
use crate::kernel::debug::log_trace;
use crate::reg::RegisterIo;
use crate::types::RegOffset;

// ============================================================================
// Registers
// ============================================================================

/// Size of the register block in bytes
pub const REGISTER_SPAN: usize = 0x18;

/// A 32-bit register in the block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Register {
    Ctrl = 0x00,
    Stat = 0x04,
    Irq = 0x08,
    Kar = 0x0C,
    Iar = 0x10,
    Oar = 0x14,
}

impl Register {
    /// Byte offset from the register base
    pub const fn offset(self) -> RegOffset {
        self as RegOffset
    }

    /// Register mnemonic
    pub const fn name(self) -> &'static str {
        match self {
            Register::Ctrl => "CTRL",
            Register::Stat => "STAT",
            Register::Irq => "IRQ",
            Register::Kar => "KAR",
            Register::Iar => "IAR",
            Register::Oar => "OAR",
        }
    }
}

// ============================================================================
// Fields
// ============================================================================

/// A bit range within one register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub reg: Register,
    pub pos: u32,
    pub mask: u32,
}

impl Field {
    const fn new(reg: Register, pos: u32, width: u32) -> Self {
        Self {
            reg,
            pos,
            mask: field_mask(pos, width),
        }
    }
}

pub const CTRL_OP: Field = Field::new(Register::Ctrl, 0, 1); // Operation mode
pub const CTRL_IE: Field = Field::new(Register::Ctrl, 1, 1); // Interrupt enable

pub const STAT_BUSY: Field = Field::new(Register::Stat, 0, 1); // Operation in progress
pub const STAT_IRQ: Field = Field::new(Register::Stat, 1, 1); // Interrupt pending
pub const STAT_ERR: Field = Field::new(Register::Stat, 2, 2); // Error code

pub const IRQ_COMPLETE: Field = Field::new(Register::Irq, 0, 1);
pub const IRQ_ERR: Field = Field::new(Register::Irq, 1, 1);

pub const KAR_ADDR: Field = Field::new(Register::Kar, 0, 32);
pub const IAR_ADDR: Field = Field::new(Register::Iar, 0, 32);
pub const OAR_ADDR: Field = Field::new(Register::Oar, 0, 32);

bitflags::bitflags! {
    /// Asserted bits of the IRQ register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u32 {
        /// Operation finished successfully
        const COMPLETE = IRQ_COMPLETE.mask;

        /// Operation failed, code in STAT.ERR
        const ERROR = IRQ_ERR.mask;
    }
}

// ============================================================================
// Register File
// ============================================================================

/// Typed access to the SimpleAES register block
pub struct RegisterFile<R> {
    io: R,
}

impl<R: RegisterIo> RegisterFile<R> {
    /// Wrap a mapped register block
    pub const fn new(io: R) -> Self {
        Self { io }
    }

    /// Read a whole register
    pub fn read(&self, reg: Register) -> u32 {
        let value = self.io.read32(reg.offset());
        log_trace!("{} -> {:#010x}", reg.name(), value);
        value
    }

    /// Write a whole register
    pub fn write(&mut self, reg: Register, value: u32) {
        log_trace!("{} <- {:#010x}", reg.name(), value);
        self.io.write32(reg.offset(), value);
    }

    /// Read one field, shifted down to bit 0
    pub fn read_field(&self, field: Field) -> u32 {
        field_get(self.read(field.reg), field.pos, field.mask)
    }

    /// Read-modify-write one field, leaving the rest of the word intact
    pub fn write_field(&mut self, field: Field, value: u32) {
        let word = self.read(field.reg);
        self.write(field.reg, field_set(word, field.pos, field.mask, value));
    }

    /// Check STAT.BUSY
    pub fn is_busy(&self) -> bool {
        self.read_field(STAT_BUSY) == 1
    }
}
