// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! SimpleAES Operation Orchestrator
//!
//! Turns one encrypt/decrypt request into a synchronous call on top of the
//! interrupt-completing device.
//!
//! # Sequence
//!
//! ```text
//! Idle -> AllocatingKey -> AllocatingInput -> AllocatingOutput
//!      -> ProgrammingMode -> CopyingIn -> ProgrammingAddresses
//!      -> (triggered) -> AwaitingCompletion -> CopyingOut -> Idle
//! ```
//!
//! The three DMA buffers are scoped guards acquired in order, so any early
//! return frees output, then input, then key. Every path frees all buffers
//! that were allocated before the call returns, except a failed wait with
//! STAT.BUSY still set: the device may yet write through KAR/IAR/OAR, so the
//! buffers are parked on the instance and freed by the next call that finds
//! the device idle.
//!
//! # Concurrency
//!
//! One operation per instance at a time. A second caller, or a call made
//! while STAT.BUSY is set, fails immediately with `DeviceBusy`; requests are
//! never queued. The register lock is never held across the completion
//! wait.

use core::sync::atomic::{AtomicBool, Ordering};

use super::regs::{CTRL_IE, CTRL_OP, IAR_ADDR, KAR_ADDR, OAR_ADDR};
use super::{Block, OpMode, SimpleAes, BLOCK_SIZE};
use crate::err::{AesError, Result};
use crate::kernel::debug::{log_debug, log_error, log_trace};
use crate::kernel::dma::{DmaAllocator, DmaBuffer};
use crate::kernel::sync::{RecvError, WaitQueue};
use crate::kernel::usercopy::CopyFault;
use crate::reg::RegisterIo;
use crate::types::BusAddr;

/// Source of key and input bytes and sink for the output block
///
/// User requests fault per access; in-kernel requests never do.
pub trait OperationIo {
    /// Fill `dst` with the key
    fn read_key(&mut self, dst: &mut [u8]) -> core::result::Result<(), CopyFault>;

    /// Fill `dst` with the input block
    fn read_input(&mut self, dst: &mut [u8]) -> core::result::Result<(), CopyFault>;

    /// Deliver the output block
    fn write_output(&mut self, src: &[u8]) -> core::result::Result<(), CopyFault>;
}

/// An in-kernel request over borrowed key and input blocks
pub struct BlockRequest<'a> {
    key: &'a Block,
    input: &'a Block,
    output: Block,
}

impl<'a> BlockRequest<'a> {
    pub fn new(key: &'a Block, input: &'a Block) -> Self {
        Self {
            key,
            input,
            output: [0; BLOCK_SIZE],
        }
    }

    /// Take the output block
    pub fn into_output(self) -> Block {
        self.output
    }
}

impl OperationIo for BlockRequest<'_> {
    fn read_key(&mut self, dst: &mut [u8]) -> core::result::Result<(), CopyFault> {
        dst.copy_from_slice(self.key);
        Ok(())
    }

    fn read_input(&mut self, dst: &mut [u8]) -> core::result::Result<(), CopyFault> {
        dst.copy_from_slice(self.input);
        Ok(())
    }

    fn write_output(&mut self, src: &[u8]) -> core::result::Result<(), CopyFault> {
        self.output.copy_from_slice(src);
        Ok(())
    }
}

/// Orchestrator states that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AllocatingKey,
    AllocatingInput,
    AllocatingOutput,
    ProgrammingMode,
    CopyingIn,
    ProgrammingAddresses,
    AwaitingCompletion,
    CopyingOut,
}

/// Holds the instance's single in-flight slot until dropped
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Narrow a bus address to the 32-bit address registers
fn bus32(addr: BusAddr) -> Option<u32> {
    u32::try_from(addr).ok()
}

impl<R, A, W> SimpleAes<R, A, W>
where
    R: RegisterIo,
    A: DmaAllocator,
    W: WaitQueue,
{
    /// Encrypt one block
    pub fn encrypt<T: OperationIo + ?Sized>(&self, io: &mut T) -> Result {
        self.run_operation(OpMode::Encrypt, io)
    }

    /// Decrypt one block
    pub fn decrypt<T: OperationIo + ?Sized>(&self, io: &mut T) -> Result {
        self.run_operation(OpMode::Decrypt, io)
    }

    /// Encrypt `input` under `key`, returning the output block
    pub fn encrypt_block(&self, key: &Block, input: &Block) -> Result<Block> {
        let mut request = BlockRequest::new(key, input);
        self.encrypt(&mut request)?;
        Ok(request.into_output())
    }

    /// Decrypt `input` under `key`, returning the output block
    pub fn decrypt_block(&self, key: &Block, input: &Block) -> Result<Block> {
        let mut request = BlockRequest::new(key, input);
        self.decrypt(&mut request)?;
        Ok(request.into_output())
    }

    /// Run one operation to completion
    ///
    /// Blocks once, waiting for the completion interrupt. Returns the
    /// classified failure of whichever step failed first. DMA buffers are
    /// released before returning unless the device is still busy after a
    /// failed wait, in which case they stay parked until it goes idle.
    pub fn run_operation<T: OperationIo + ?Sized>(&self, mode: OpMode, io: &mut T) -> Result {
        let _claim = match InFlight::claim(&self.in_flight) {
            Some(claim) => claim,
            None => {
                log_debug!("{:?}: another operation in flight", mode);
                return Err(AesError::DeviceBusy);
            }
        };

        if self.is_busy() {
            log_debug!("{:?}: device busy", mode);
            return Err(AesError::DeviceBusy);
        }
        self.release_parked();

        let mut key = DmaBuffer::allocate(&self.dma, BLOCK_SIZE)
            .map_err(|_| fail(Stage::AllocatingKey, AesError::KeyError))?;
        let mut input = DmaBuffer::allocate(&self.dma, BLOCK_SIZE)
            .map_err(|_| fail(Stage::AllocatingInput, AesError::InputError))?;
        let output = DmaBuffer::allocate(&self.dma, BLOCK_SIZE)
            .map_err(|_| fail(Stage::AllocatingOutput, AesError::OutputError))?;

        self.program_mode(mode)
            .map_err(|err| fail(Stage::ProgrammingMode, err))?;

        io.read_key(key.as_mut_slice())
            .map_err(|fault| fail_copy(fault, AesError::KeyError))?;
        io.read_input(input.as_mut_slice())
            .map_err(|fault| fail_copy(fault, AesError::InputError))?;

        self.program_addresses(key.bus_addr(), input.bus_addr(), output.bus_addr())
            .map_err(|err| fail(Stage::ProgrammingAddresses, err))?;

        log_trace!("{:?}: triggered", mode);

        if let Err(err) = self.await_completion() {
            if self.is_busy() {
                log_error!("{:?}: device still busy, parking buffers", mode);
                // Stored output first so release frees in reverse order
                *self.parked.lock() = Some([output.into_raw(), input.into_raw(), key.into_raw()]);
            }
            return Err(fail(Stage::AwaitingCompletion, err));
        }

        io.write_output(output.as_slice()).map_err(|fault| {
            log_error!("{:?}: {}", Stage::CopyingOut, fault);
            fail(Stage::CopyingOut, AesError::OutputError)
        })?;

        log_debug!("{:?}: complete", mode);
        Ok(())
    }

    /// Free buffers left behind by an abandoned operation
    ///
    /// Only called once STAT.BUSY reads clear.
    fn release_parked(&self) {
        let parked = self.parked.lock().take();
        if let Some(buffers) = parked {
            log_debug!("releasing {} parked buffers", buffers.len());
            for buf in buffers {
                // SAFETY: allocated from `self.dma`, and the device that held
                // their addresses is idle.
                unsafe { buf.free(&self.dma) };
            }
        }
    }

    /// Set CTRL.OP and CTRL.IE
    ///
    /// Rechecks STAT.BUSY under the lock and drops any stale completion so
    /// the coming wait only sees this operation's result.
    fn program_mode(&self, mode: OpMode) -> Result {
        let mut regs = self.regs.lock();
        if regs.is_busy() {
            return Err(AesError::DeviceBusy);
        }
        self.completion.reset();
        regs.write_field(CTRL_OP, mode as u32);
        regs.write_field(CTRL_IE, 1);
        Ok(())
    }

    /// Write KAR, IAR and OAR
    ///
    /// The OAR write starts the device.
    fn program_addresses(&self, key: BusAddr, input: BusAddr, output: BusAddr) -> Result {
        let kar = bus32(key).ok_or(AesError::KeyError)?;
        let iar = bus32(input).ok_or(AesError::InputError)?;
        let oar = bus32(output).ok_or(AesError::OutputError)?;

        let mut regs = self.regs.lock();
        regs.write_field(KAR_ADDR, kar);
        regs.write_field(IAR_ADDR, iar);
        regs.write_field(OAR_ADDR, oar);
        Ok(())
    }

    fn await_completion(&self) -> Result {
        match self.completion.receive_within(self.config.completion_timeout) {
            Ok(result) => result,
            Err(RecvError::NoResult) => {
                log_error!("woken without a completion");
                Err(AesError::OtherError)
            }
            Err(RecvError::TimedOut) => {
                log_error!(
                    "no completion within {:?}, disabling interrupt",
                    self.config.completion_timeout
                );
                self.regs.lock().write_field(CTRL_IE, 0);
                Err(AesError::OtherError)
            }
        }
    }
}

fn fail(stage: Stage, err: AesError) -> AesError {
    log_error!("{:?} failed: {}", stage, err);
    err
}

fn fail_copy(fault: CopyFault, err: AesError) -> AesError {
    log_error!("{:?}: {}", Stage::CopyingIn, fault);
    fail(Stage::CopyingIn, err)
}
