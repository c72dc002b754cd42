// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! SimpleAES Accelerator Driver
//!
//! The SimpleAES engine encrypts or decrypts one 128-byte block per
//! operation. Software hands it three coherent DMA buffers (key, input,
//! output) by bus address and waits for a completion interrupt.
//!
//! # Structure
//!
//! - [`regs`]: register map and typed register file
//! - [`ops`]: the operation orchestrator (`run_operation`)
//! - [`irq`]: the interrupt handler
//! - [`ioctl`]: the user request surface
//!
//! # Binding
//!
//! The host binds the device through [`SimpleAesDriver::probe`], which looks
//! up the `simpleaes-irq`, `simpleaes-regmem` and `simpleaes-clock`
//! resources, registers the interrupt handler and enables the clock.
//! [`SimpleAesDriver::remove`] (or dropping the driver) reverses both.
//!
//! # Boot Arguments
//!
//! - `simpleaes.timeout_ms=N`: bound the completion wait to N ms (0 = wait
//!   forever, the default)

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use crate::err::{BindError, EINVAL};
use crate::kernel::cmdline::Cmdline;
use crate::kernel::debug::{log_error, log_info};
use crate::kernel::dma::{DmaAllocator, RawDmaBuffer};
use crate::kernel::sync::{CompletionChannel, IrqSpinLock, WaitQueue};
use crate::platform::{Clock, InterruptHandler, PlatformDevice};
use crate::reg::RegisterIo;
use crate::types::Irq;

pub mod ioctl;
pub mod irq;
pub mod ops;
pub mod regs;

#[cfg(test)]
pub(crate) mod sim;

pub use ioctl::{IoctlData, IOCTL_DECRYPT, IOCTL_ENCRYPT, IOCTL_MAGIC};
pub use ops::{BlockRequest, OperationIo};
pub use regs::RegisterFile;

use regs::{CTRL_IE, REGISTER_SPAN};

// ============================================================================
// Constants
// ============================================================================

/// Key, input and output block size in bytes
pub const BLOCK_SIZE: usize = 128;

/// One key, input or output block
pub type Block = [u8; BLOCK_SIZE];

/// Driver and device node name
pub const DEVICE_NAME: &str = "simpleaes";

/// Device tree compatible string
pub const COMPATIBLE: &str = "org-simple-simpleaes";

/// Interrupt resource name
pub const IRQ_RESOURCE: &str = "simpleaes-irq";

/// Register space resource name
pub const REGMEM_RESOURCE: &str = "simpleaes-regmem";

/// Clock resource name
pub const CLOCK_RESOURCE: &str = "simpleaes-clock";

/// Operation mode written to CTRL.OP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum OpMode {
    Encrypt = 0,
    Decrypt = 1,
}

// ============================================================================
// Configuration
// ============================================================================

/// Per-instance driver configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimpleAesConfig {
    /// Upper bound on the completion wait (`None` = wait forever)
    pub completion_timeout: Option<Duration>,
}

impl SimpleAesConfig {
    /// Boot argument holding the completion timeout in milliseconds
    pub const TIMEOUT_KEY: &'static str = "simpleaes.timeout_ms";

    /// Read the configuration from the kernel command line
    pub fn from_cmdline(cmdline: &Cmdline<'_>) -> Self {
        let completion_timeout = match cmdline.get_u32(Self::TIMEOUT_KEY, 0) {
            0 => None,
            ms => Some(Duration::from_millis(u64::from(ms))),
        };
        Self { completion_timeout }
    }

    /// Bound the completion wait
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Device Instance
// ============================================================================

/// One SimpleAES accelerator
///
/// All register access goes through `regs`, which is shared with the
/// interrupt handler. At most one operation is in flight at a time.
///
/// Buffers of an operation abandoned while STAT.BUSY was still set are kept
/// in `parked` and only freed once the device is seen idle. If the instance
/// is dropped first they are leaked.
pub struct SimpleAes<R, A, W> {
    regs: IrqSpinLock<RegisterFile<R>>,
    completion: CompletionChannel<crate::err::Result, W>,
    dma: A,
    parked: IrqSpinLock<Option<[RawDmaBuffer; 3]>>,
    irq_line: Irq,
    config: SimpleAesConfig,
    in_flight: AtomicBool,
    detached: AtomicBool,
}

impl<R: RegisterIo, A: DmaAllocator, W: WaitQueue> SimpleAes<R, A, W> {
    /// Create an instance over a mapped register block
    ///
    /// The caller is responsible for routing `irq_line` to
    /// [`InterruptHandler::handle_irq`]; [`SimpleAesDriver::probe`] does
    /// this through the platform device.
    pub fn new(regs: R, irq_line: Irq, dma: A, waiters: W, config: SimpleAesConfig) -> Self {
        Self {
            regs: IrqSpinLock::new(RegisterFile::new(regs)),
            completion: CompletionChannel::new(waiters),
            dma,
            parked: IrqSpinLock::new(None),
            irq_line,
            config,
            in_flight: AtomicBool::new(false),
            detached: AtomicBool::new(false),
        }
    }

    /// Interrupt line this instance is bound to
    pub fn irq_line(&self) -> Irq {
        self.irq_line
    }

    /// Active configuration
    pub fn config(&self) -> &SimpleAesConfig {
        &self.config
    }

    /// Check STAT.BUSY
    pub fn is_busy(&self) -> bool {
        self.regs.lock().is_busy()
    }

    /// Check whether the instance has been torn down
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

// ============================================================================
// Platform Driver
// ============================================================================

/// A SimpleAES instance bound to a platform device
pub struct SimpleAesDriver<P: PlatformDevice, A, W> {
    pdev: P,
    dev: Arc<SimpleAes<P::Regs, A, W>>,
    clock: P::Clock,
}

impl<P, A, W> SimpleAesDriver<P, A, W>
where
    P: PlatformDevice,
    A: DmaAllocator + 'static,
    W: WaitQueue + 'static,
{
    /// Bind the driver to `pdev`
    ///
    /// Acquires the interrupt line, register space and clock, registers the
    /// interrupt handler and enables the clock. On failure everything
    /// already acquired is released in reverse order.
    pub fn probe(pdev: P, dma: A, waiters: W, config: SimpleAesConfig) -> Result<Self, BindError> {
        let irq = match pdev.get_irq_byname(IRQ_RESOURCE) {
            Some(irq) if irq > 0 => irq,
            _ => {
                log_error!("{}: {} interrupt not found", pdev.name(), IRQ_RESOURCE);
                return Err(BindError::IrqNotFound);
            }
        };

        let regs = pdev.ioremap_resource_byname(REGMEM_RESOURCE).map_err(|status| {
            log_error!("{}: {} memory resource not found", pdev.name(), REGMEM_RESOURCE);
            BindError::RegisterSpace(status)
        })?;
        if regs.span() < REGISTER_SPAN {
            log_error!(
                "{}: {} is {:#x} bytes, need {:#x}",
                pdev.name(),
                REGMEM_RESOURCE,
                regs.span(),
                REGISTER_SPAN
            );
            return Err(BindError::RegisterSpace(EINVAL));
        }

        let clock = pdev.clk_get_byname(CLOCK_RESOURCE).map_err(|status| {
            log_error!("{}: {} clock resource not found", pdev.name(), CLOCK_RESOURCE);
            BindError::ClockNotFound(status)
        })?;

        let dev = Arc::new(SimpleAes::new(regs, irq, dma, waiters, config));

        let handler: Arc<dyn InterruptHandler> = dev.clone();
        pdev.request_irq(irq, IRQ_RESOURCE, handler).map_err(|status| {
            log_error!("{}: failed to request interrupt {} ({})", pdev.name(), irq, status);
            BindError::IrqRequest(status)
        })?;

        if let Err(status) = clock.prepare_enable() {
            log_error!("{}: failed to enable clock ({})", pdev.name(), status);
            pdev.free_irq(irq);
            return Err(BindError::ClockEnable(status));
        }

        log_info!("{}: bound on irq {}", pdev.name(), irq);
        Ok(Self { pdev, dev, clock })
    }

    /// The bound device instance
    pub fn device(&self) -> &SimpleAes<P::Regs, A, W> {
        &self.dev
    }

    /// The platform device the driver is bound to
    pub fn platform_device(&self) -> &P {
        &self.pdev
    }

    /// Unbind the driver
    ///
    /// Disables the device interrupt, then the clock, then releases the
    /// interrupt line.
    pub fn remove(self) {
        drop(self);
    }
}

impl<P: PlatformDevice, A, W> Drop for SimpleAesDriver<P, A, W> {
    fn drop(&mut self) {
        detach_instance(&self.dev);
        self.clock.disable_unprepare();
        self.pdev.free_irq(self.dev.irq_line);
        log_info!("{}: removed", self.pdev.name());
    }
}

/// Mark `dev` detached and clear CTRL.IE
///
/// After this the interrupt handler no longer touches the register block.
fn detach_instance<R: RegisterIo, A, W>(dev: &SimpleAes<R, A, W>) {
    let mut regs = dev.regs.lock();
    if !dev.detached.swap(true, Ordering::AcqRel) {
        regs.write_field(CTRL_IE, 0);
    }
}
