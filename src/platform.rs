// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Platform Binding Module
//!
//! This module describes what the host must provide when it binds a
//! platform device to a driver: named resources (interrupt line, register
//! space, clock), interrupt handler registration and clock gating.
//!
//! Everything the host supplies stays valid until the driver's teardown
//! returns.

use alloc::sync::Arc;

use crate::reg::RegisterIo;
use crate::types::{Irq, Status};

/// Outcome of an interrupt handler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not raised by this device
    None,

    /// The interrupt was handled and acknowledged
    Handled,
}

/// An interrupt handler registered on a (possibly shared) line
///
/// Runs in interrupt context: it must not block or sleep.
pub trait InterruptHandler: Send + Sync {
    /// Handle one assertion of `irq`
    fn handle_irq(&self, irq: Irq) -> IrqReturn;
}

/// A device clock handle
pub trait Clock {
    /// Prepare and enable the clock
    fn prepare_enable(&self) -> Result<(), Status>;

    /// Disable and unprepare the clock
    fn disable_unprepare(&self);
}

/// A platform device as handed to a driver's probe routine
pub trait PlatformDevice {
    /// Register block type produced by mapping the register resource
    type Regs: RegisterIo + 'static;

    /// Clock handle type
    type Clock: Clock;

    /// Device name used in diagnostics
    fn name(&self) -> &str;

    /// Look up an interrupt line by resource name
    fn get_irq_byname(&self, name: &str) -> Option<Irq>;

    /// Map a memory resource by name
    fn ioremap_resource_byname(&self, name: &str) -> Result<Self::Regs, Status>;

    /// Look up a clock by name
    fn clk_get_byname(&self, name: &str) -> Result<Self::Clock, Status>;

    /// Register `handler` on `irq` as a shared handler
    fn request_irq(
        &self,
        irq: Irq,
        name: &'static str,
        handler: Arc<dyn InterruptHandler>,
    ) -> Result<(), Status>;

    /// Unregister the handler previously installed on `irq`
    fn free_irq(&self, irq: Irq);
}
