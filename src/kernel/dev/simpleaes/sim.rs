// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Simulated SimpleAES Peripheral
//!
//! A register-level model of the device for unit tests:
//!
//! - Register block with write-1-to-clear IRQ and a trace of every access
//!   made through [`SimRegs`]
//! - A DMA engine started by the OAR write (with CTRL.IE set) that reaches
//!   buffers through the shared [`DmaPool`] and runs AES-256 over the block
//!   on its own thread, then raises the interrupt
//! - Error, hang and delay injection
//! - A platform device with named resources that records binding steps

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;

use super::regs::{
    IrqFlags, Register, CTRL_IE, CTRL_OP, REGISTER_SPAN, STAT_BUSY, STAT_ERR, STAT_IRQ,
};
use super::{
    SimpleAes, SimpleAesConfig, BLOCK_SIZE, CLOCK_RESOURCE, IRQ_RESOURCE, REGMEM_RESOURCE,
};
use crate::bits::{field_get, field_set};
use crate::err::ENODEV;
use crate::kernel::dma::{DmaAllocator, DmaError, DmaPool};
use crate::kernel::sync::CondvarWaitQueue;
use crate::platform::{Clock, InterruptHandler, PlatformDevice};
use crate::reg::RegisterIo;
use crate::types::{BusAddr, Irq, RegOffset, Status};

/// Interrupt line used by [`sim_device`]
pub(crate) const SIM_IRQ: Irq = 5;

/// DMA slots backing one simulated device
const POOL_SLOTS: usize = 8;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn register_at(offset: RegOffset) -> Register {
    match offset {
        0x00 => Register::Ctrl,
        0x04 => Register::Stat,
        0x08 => Register::Irq,
        0x0C => Register::Kar,
        0x10 => Register::Iar,
        0x14 => Register::Oar,
        _ => panic!("no SimpleAES register at {:#x}", offset),
    }
}

/// One traced register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read(Register, u32),
    Write(Register, u32),
}

/// What the engine does once started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Engine {
    /// Run the cipher and complete
    Aes,

    /// Raise IRQ.ERR with this STAT.ERR code
    Fail(u32),

    /// Stay busy forever
    Hang,

    /// Sleep, then run the cipher
    Delay(Duration),
}

// ============================================================================
// Hardware Model
// ============================================================================

pub(crate) struct SimHw {
    regs: [AtomicU32; REGISTER_SPAN / 4],
    trace: Mutex<Vec<Access>>,
    pool: Arc<DmaPool>,
    engine: Mutex<Engine>,
    engine_runs: AtomicUsize,
    workers: Mutex<Vec<JoinHandle<()>>>,
    handler: Mutex<Option<(Weak<dyn InterruptHandler>, Irq)>>,
}

impl SimHw {
    /// Create a device whose DMA window starts at `bus_base`
    pub(crate) fn new(bus_base: BusAddr) -> Arc<Self> {
        let region = Box::leak(vec![0u8; POOL_SLOTS * BLOCK_SIZE].into_boxed_slice());
        Arc::new(Self {
            regs: Default::default(),
            trace: Mutex::new(Vec::new()),
            pool: Arc::new(DmaPool::from_static(region, bus_base, BLOCK_SIZE)),
            engine: Mutex::new(Engine::Aes),
            engine_runs: AtomicUsize::new(0),
            workers: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
        })
    }

    pub(crate) fn pool(&self) -> Arc<DmaPool> {
        Arc::clone(&self.pool)
    }

    /// Route the interrupt to `handler`
    pub(crate) fn connect(&self, handler: Weak<dyn InterruptHandler>, irq: Irq) {
        *lock(&self.handler) = Some((handler, irq));
    }

    pub(crate) fn disconnect(&self) {
        *lock(&self.handler) = None;
    }

    pub(crate) fn set_engine(&self, engine: Engine) {
        *lock(&self.engine) = engine;
    }

    /// Number of times the engine was started
    pub(crate) fn engine_runs(&self) -> usize {
        self.engine_runs.load(Ordering::SeqCst)
    }

    /// Wait for every started engine run to finish
    pub(crate) fn settle(&self) {
        let workers: Vec<_> = lock(&self.workers).drain(..).collect();
        for worker in workers {
            worker.join().unwrap();
        }
    }

    /// Register accesses made through `SimRegs` so far
    pub(crate) fn log(&self) -> Vec<Access> {
        lock(&self.trace).clone()
    }

    pub(crate) fn clear_log(&self) {
        lock(&self.trace).clear();
    }

    // Backdoor accessors, not traced

    fn load(&self, reg: Register) -> u32 {
        self.regs[reg.offset() / 4].load(Ordering::SeqCst)
    }

    fn store(&self, reg: Register, value: u32) {
        self.regs[reg.offset() / 4].store(value, Ordering::SeqCst);
    }

    fn update(&self, reg: Register, f: impl Fn(u32) -> u32) {
        let _ = self.regs[reg.offset() / 4].fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
            Some(f(v))
        });
    }

    pub(crate) fn ctrl(&self) -> u32 {
        self.load(Register::Ctrl)
    }

    pub(crate) fn irq(&self) -> u32 {
        self.load(Register::Irq)
    }

    pub(crate) fn is_busy(&self) -> bool {
        field_get(self.load(Register::Stat), STAT_BUSY.pos, STAT_BUSY.mask) == 1
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.update(Register::Stat, |v| {
            field_set(v, STAT_BUSY.pos, STAT_BUSY.mask, busy as u32)
        });
    }

    pub(crate) fn set_err_code(&self, code: u32) {
        self.update(Register::Stat, |v| field_set(v, STAT_ERR.pos, STAT_ERR.mask, code));
    }

    /// Assert IRQ bits without dispatching the handler
    pub(crate) fn set_irq(&self, bits: u32) {
        self.store(Register::Irq, bits);
        self.update(Register::Stat, |v| {
            field_set(v, STAT_IRQ.pos, STAT_IRQ.mask, (bits != 0) as u32)
        });
    }

    // Bus side, traced

    fn bus_read(&self, offset: RegOffset) -> u32 {
        let reg = register_at(offset);
        let value = self.load(reg);
        lock(&self.trace).push(Access::Read(reg, value));
        value
    }

    fn bus_write(self: &Arc<Self>, offset: RegOffset, value: u32) {
        let reg = register_at(offset);
        lock(&self.trace).push(Access::Write(reg, value));

        match reg {
            // Read-only
            Register::Stat => {}
            // Write-1-to-clear
            Register::Irq => {
                self.update(Register::Irq, |v| v & !value);
                if self.irq() == 0 {
                    self.update(Register::Stat, |v| v & !STAT_IRQ.mask);
                }
            }
            Register::Oar => {
                self.store(reg, value);
                if self.ctrl() & CTRL_IE.mask != 0 {
                    self.start();
                }
            }
            _ => self.store(reg, value),
        }
    }

    fn start(self: &Arc<Self>) {
        self.set_busy(true);
        self.engine_runs.fetch_add(1, Ordering::SeqCst);

        let engine = *lock(&self.engine);
        if engine == Engine::Hang {
            return;
        }

        let hw = Arc::clone(self);
        let worker = thread::spawn(move || hw.run(engine));
        lock(&self.workers).push(worker);
    }

    /// One engine run: transfer, cipher, raise the interrupt
    fn run(&self, engine: Engine) {
        let outcome = match engine {
            Engine::Fail(code) => Err(code),
            Engine::Delay(delay) => {
                thread::sleep(delay);
                self.transfer()
            }
            _ => self.transfer(),
        };

        let (irq, code) = match outcome {
            Ok(()) => (IrqFlags::COMPLETE, 0),
            Err(code) => (IrqFlags::ERROR, code),
        };
        self.update(Register::Stat, |v| {
            let v = field_set(v, STAT_ERR.pos, STAT_ERR.mask, code);
            let v = field_set(v, STAT_IRQ.pos, STAT_IRQ.mask, 1);
            field_set(v, STAT_BUSY.pos, STAT_BUSY.mask, 0)
        });
        self.update(Register::Irq, |v| v | irq.bits());

        let handler = lock(&self.handler).clone();
        if let Some((handler, line)) = handler {
            if let Some(handler) = handler.upgrade() {
                handler.handle_irq(line);
            }
        }
    }

    /// Run the cipher over the programmed buffers, or return the STAT.ERR
    /// code of the buffer that could not be reached
    fn transfer(&self) -> Result<(), u32> {
        let resolve = |reg: Register, code: u32| {
            self.pool
                .translate(BusAddr::from(self.load(reg)), BLOCK_SIZE)
                .ok_or(code)
        };
        let key = resolve(Register::Kar, 1)?;
        let input = resolve(Register::Iar, 2)?;
        let output = resolve(Register::Oar, 3)?;

        let mut key_bytes = [0u8; BLOCK_SIZE];
        let mut data = [0u8; BLOCK_SIZE];
        unsafe {
            core::ptr::copy_nonoverlapping(key.as_ptr(), key_bytes.as_mut_ptr(), BLOCK_SIZE);
            core::ptr::copy_nonoverlapping(input.as_ptr(), data.as_mut_ptr(), BLOCK_SIZE);
        }

        let decrypt = self.ctrl() & CTRL_OP.mask != 0;
        let cipher = Aes256::new(GenericArray::from_slice(&key_bytes[..32]));
        for chunk in data.chunks_exact_mut(16) {
            let block = GenericArray::from_mut_slice(chunk);
            if decrypt {
                cipher.decrypt_block(block);
            } else {
                cipher.encrypt_block(block);
            }
        }

        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), output.as_ptr(), BLOCK_SIZE);
        }
        Ok(())
    }
}

/// CPU view of the simulated register block
pub(crate) struct SimRegs {
    hw: Arc<SimHw>,
    span: usize,
}

impl SimRegs {
    pub(crate) fn new(hw: &Arc<SimHw>) -> Self {
        Self {
            hw: Arc::clone(hw),
            span: REGISTER_SPAN,
        }
    }
}

impl RegisterIo for SimRegs {
    fn span(&self) -> usize {
        self.span
    }

    fn read32(&self, offset: RegOffset) -> u32 {
        self.hw.bus_read(offset)
    }

    fn write32(&self, offset: RegOffset, value: u32) {
        self.hw.bus_write(offset, value)
    }
}

// ============================================================================
// DMA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DmaEvent {
    Alloc(BusAddr),
    Free(BusAddr),
}

impl DmaEvent {
    pub(crate) fn alloc(&self) -> Option<BusAddr> {
        match *self {
            DmaEvent::Alloc(bus) => Some(bus),
            DmaEvent::Free(_) => None,
        }
    }

    pub(crate) fn free(&self) -> Option<BusAddr> {
        match *self {
            DmaEvent::Free(bus) => Some(bus),
            DmaEvent::Alloc(_) => None,
        }
    }
}

type AllocHook = Box<dyn FnMut() + Send>;

/// Pool allocator that records traffic and can fail the Nth allocation
pub(crate) struct FaultyDma {
    pool: Arc<DmaPool>,
    fail_at: AtomicUsize,
    attempts: AtomicUsize,
    events: Mutex<Vec<DmaEvent>>,
    hook: Mutex<Option<(usize, AllocHook)>>,
}

impl FaultyDma {
    pub(crate) fn new(pool: Arc<DmaPool>) -> Self {
        Self {
            pool,
            fail_at: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
        }
    }

    /// Run `hook` right after the `n`th allocation from now succeeds
    pub(crate) fn on_alloc(&self, n: usize, hook: impl FnMut() + Send + 'static) {
        self.attempts.store(0, Ordering::SeqCst);
        *lock(&self.hook) = Some((n, Box::new(hook)));
    }

    /// Fail the `n`th allocation from now (1-based)
    pub(crate) fn fail_at(&self, n: usize) {
        self.attempts.store(0, Ordering::SeqCst);
        self.fail_at.store(n, Ordering::SeqCst);
    }

    pub(crate) fn events(&self) -> Vec<DmaEvent> {
        lock(&self.events).clone()
    }

    /// Buffers currently allocated
    pub(crate) fn outstanding(&self) -> usize {
        self.pool.in_use()
    }
}

impl DmaAllocator for FaultyDma {
    fn alloc_coherent(&self, size: usize) -> Result<(core::ptr::NonNull<u8>, BusAddr), DmaError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_at.load(Ordering::SeqCst) {
            return Err(DmaError);
        }
        let (cpu, bus) = self.pool.alloc_coherent(size)?;
        lock(&self.events).push(DmaEvent::Alloc(bus));
        if let Some((n, hook)) = lock(&self.hook).as_mut() {
            if *n == attempt {
                hook();
            }
        }
        Ok((cpu, bus))
    }

    unsafe fn free_coherent(&self, cpu: core::ptr::NonNull<u8>, bus: BusAddr, size: usize) {
        lock(&self.events).push(DmaEvent::Free(bus));
        self.pool.free_coherent(cpu, bus, size);
    }
}

pub(crate) type SimAes = SimpleAes<SimRegs, Arc<FaultyDma>, CondvarWaitQueue>;

/// A device instance wired to a fresh simulated peripheral
pub(crate) fn sim_device(config: SimpleAesConfig) -> (Arc<SimHw>, Arc<FaultyDma>, Arc<SimAes>) {
    sim_device_at(0x4000_0000, config)
}

/// Like [`sim_device`], with the DMA window at `bus_base`
pub(crate) fn sim_device_at(
    bus_base: BusAddr,
    config: SimpleAesConfig,
) -> (Arc<SimHw>, Arc<FaultyDma>, Arc<SimAes>) {
    let hw = SimHw::new(bus_base);
    let dma = Arc::new(FaultyDma::new(hw.pool()));
    let dev = Arc::new(SimpleAes::new(
        SimRegs::new(&hw),
        SIM_IRQ,
        Arc::clone(&dma),
        CondvarWaitQueue::new(),
        config,
    ));

    let handler: Arc<dyn InterruptHandler> = dev.clone();
    hw.connect(Arc::downgrade(&handler), SIM_IRQ);
    (hw, dma, dev)
}

// ============================================================================
// Platform
// ============================================================================

/// One host binding call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    GetIrq,
    MapRegs,
    GetClock,
    RequestIrq(Irq),
    ClockEnable,
    ClockDisable,
    FreeIrq(Irq),
}

#[derive(Clone, Default)]
pub(crate) struct StepLog(Arc<Mutex<Vec<Step>>>);

impl StepLog {
    fn push(&self, step: Step) {
        lock(&self.0).push(step);
    }

    pub(crate) fn snapshot(&self) -> Vec<Step> {
        lock(&self.0).clone()
    }
}

pub(crate) struct SimClock {
    steps: StepLog,
    fail_enable: Option<Status>,
}

impl Clock for SimClock {
    fn prepare_enable(&self) -> Result<(), Status> {
        self.steps.push(Step::ClockEnable);
        self.fail_enable.map_or(Ok(()), Err)
    }

    fn disable_unprepare(&self) {
        self.steps.push(Step::ClockDisable);
    }
}

/// Platform device carrying one simulated SimpleAES
pub(crate) struct SimPlatform {
    hw: Arc<SimHw>,
    irq: Option<Irq>,
    steps: StepLog,
    fail_regs: Option<Status>,
    regs_span: usize,
    fail_clock_lookup: Option<Status>,
    fail_request_irq: Option<Status>,
    fail_clock_enable: Option<Status>,
    handlers: Mutex<Vec<(Irq, Arc<dyn InterruptHandler>)>>,
}

impl SimPlatform {
    pub(crate) fn new(irq: Irq) -> Self {
        Self {
            hw: SimHw::new(0x4000_0000),
            irq: Some(irq),
            steps: StepLog::default(),
            fail_regs: None,
            regs_span: REGISTER_SPAN,
            fail_clock_lookup: None,
            fail_request_irq: None,
            fail_clock_enable: None,
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn without_irq(mut self) -> Self {
        self.irq = None;
        self
    }

    pub(crate) fn fail_regs(mut self, status: Status) -> Self {
        self.fail_regs = Some(status);
        self
    }

    /// Map only `span` bytes of register space
    pub(crate) fn short_regs(mut self, span: usize) -> Self {
        self.regs_span = span;
        self
    }

    pub(crate) fn fail_clock_lookup(mut self, status: Status) -> Self {
        self.fail_clock_lookup = Some(status);
        self
    }

    pub(crate) fn fail_request_irq(mut self, status: Status) -> Self {
        self.fail_request_irq = Some(status);
        self
    }

    pub(crate) fn fail_clock_enable(mut self, status: Status) -> Self {
        self.fail_clock_enable = Some(status);
        self
    }

    pub(crate) fn steps(&self) -> StepLog {
        self.steps.clone()
    }

    pub(crate) fn hw(&self) -> Arc<SimHw> {
        Arc::clone(&self.hw)
    }

    pub(crate) fn irq_requested(&self, irq: Irq) -> bool {
        lock(&self.handlers).iter().any(|(line, _)| *line == irq)
    }
}

impl PlatformDevice for SimPlatform {
    type Regs = SimRegs;
    type Clock = SimClock;

    fn name(&self) -> &str {
        "simpleaes.0"
    }

    fn get_irq_byname(&self, name: &str) -> Option<Irq> {
        self.steps.push(Step::GetIrq);
        self.irq.filter(|_| name == IRQ_RESOURCE)
    }

    fn ioremap_resource_byname(&self, name: &str) -> Result<SimRegs, Status> {
        self.steps.push(Step::MapRegs);
        match self.fail_regs {
            Some(status) => Err(status),
            None if name != REGMEM_RESOURCE => Err(ENODEV),
            None => Ok(SimRegs {
                span: self.regs_span,
                ..SimRegs::new(&self.hw)
            }),
        }
    }

    fn clk_get_byname(&self, name: &str) -> Result<SimClock, Status> {
        self.steps.push(Step::GetClock);
        match self.fail_clock_lookup {
            Some(status) => Err(status),
            None if name != CLOCK_RESOURCE => Err(ENODEV),
            None => Ok(SimClock {
                steps: self.steps.clone(),
                fail_enable: self.fail_clock_enable,
            }),
        }
    }

    fn request_irq(
        &self,
        irq: Irq,
        _name: &'static str,
        handler: Arc<dyn InterruptHandler>,
    ) -> Result<(), Status> {
        self.steps.push(Step::RequestIrq(irq));
        if let Some(status) = self.fail_request_irq {
            return Err(status);
        }
        self.hw.connect(Arc::downgrade(&handler), irq);
        lock(&self.handlers).push((irq, handler));
        Ok(())
    }

    fn free_irq(&self, irq: Irq) {
        self.steps.push(Step::FreeIrq(irq));
        self.hw.disconnect();
        lock(&self.handlers).retain(|(line, _)| *line != irq);
    }
}
