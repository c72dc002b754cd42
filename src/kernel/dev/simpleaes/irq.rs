// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! SimpleAES Interrupt Handler
//!
//! Runs in interrupt context: reads IRQ (and STAT.ERR on failure) under the
//! register lock, posts the classified result to the completion channel and
//! acknowledges by writing the IRQ word back.

use core::sync::atomic::Ordering;

use super::regs::{IrqFlags, Register, STAT_ERR};
use super::SimpleAes;
use crate::err::AesError;
use crate::kernel::debug::{log_debug, log_warn};
use crate::kernel::dma::DmaAllocator;
use crate::kernel::sync::WaitQueue;
use crate::platform::{InterruptHandler, IrqReturn};
use crate::reg::RegisterIo;
use crate::types::Irq;

/// Map a STAT.ERR code to its error classification
///
/// Codes other than 1, 2 and 3 are undefined and yield `None`.
pub const fn classify_err_code(code: u32) -> Option<AesError> {
    match code {
        1 => Some(AesError::KeyError),
        2 => Some(AesError::InputError),
        3 => Some(AesError::OutputError),
        _ => None,
    }
}

impl<R, A, W> InterruptHandler for SimpleAes<R, A, W>
where
    R: RegisterIo,
    A: DmaAllocator,
    W: WaitQueue,
{
    fn handle_irq(&self, irq: Irq) -> IrqReturn {
        let mut regs = self.regs.lock();

        if self.detached.load(Ordering::Acquire) {
            return IrqReturn::None;
        }

        let raw = regs.read(Register::Irq);
        let flags = IrqFlags::from_bits_truncate(raw);

        // Shared line: nothing asserted means another device raised it
        if flags.is_empty() {
            log_debug!("irq {}: not ours (IRQ={:#x})", irq, raw);
            return IrqReturn::None;
        }

        if flags.contains(IrqFlags::COMPLETE) {
            self.completion.send(Ok(()));
        } else {
            let code = regs.read_field(STAT_ERR);
            match classify_err_code(code) {
                Some(err) => {
                    log_debug!("irq {}: device reported {}", irq, err);
                    self.completion.send(Err(err));
                }
                None => log_warn!("irq {}: unmapped STAT.ERR code {}", irq, code),
            }
        }

        regs.write(Register::Irq, raw);
        IrqReturn::Handled
    }
}
