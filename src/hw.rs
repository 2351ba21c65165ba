//! Hardware description.
//!
//! All register addresses and bit positions live here, as typed descriptors.
//! The timing and protocol code only ever sees [`Register`] and [`Signal`]
//! handles taken from a [`Board`], never raw numbers.
//!
//! Also provides [`MmioBus`], the volatile implementation of [`Bus`] and
//! [`NativeCall`] for use on the target itself, and the [`Interrupts`] trait
//! used to protect bit timing.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::io::{Bus, NativeCall};
use crate::{Error, Result};

/// A 32-bit memory-mapped register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    addr: u32,
}

impl Register {
    /// Create a register descriptor.  The address must be word aligned.
    pub fn new(addr: u32) -> Result<Self> {
        check_aligned(addr)?;
        Ok(Self { addr })
    }

    pub const fn addr(&self) -> u32 {
        self.addr
    }

    pub fn read<B: Bus>(&self, bus: &mut B) -> u32 {
        bus.read_u32(self.addr)
    }

    pub fn write<B: Bus>(&self, bus: &mut B, value: u32) {
        bus.write_u32(self.addr, value)
    }

    /// Read-modify-write.
    pub fn modify<B: Bus>(&self, bus: &mut B, f: impl FnOnce(u32) -> u32) {
        let value = self.read(bus);
        self.write(bus, f(value));
    }
}

/// A single-bit signal embedded in a register shared with unrelated
/// functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    reg: Register,
    mask: u32,
}

impl Signal {
    /// Create a signal descriptor.  `mask` must select exactly one bit.
    pub fn new(addr: u32, mask: u32) -> Result<Self> {
        let reg = Register::new(addr)?;
        if !mask.is_power_of_two() {
            return Err(Error::InvalidMask);
        }
        Ok(Self { reg, mask })
    }

    pub const fn reg(&self) -> Register {
        self.reg
    }

    pub const fn mask(&self) -> u32 {
        self.mask
    }

    /// Sample the signal.
    pub fn is_set<B: Bus>(&self, bus: &mut B) -> bool {
        self.reg.read(bus) & self.mask != 0
    }

    /// Read the shared register once and return the `(mark, space)` register
    /// values: the current contents with this signal's bit set and cleared.
    ///
    /// Writing these back drives the signal without disturbing the other
    /// bits, as they were at the time of the read.
    pub fn levels<B: Bus>(&self, bus: &mut B) -> (u32, u32) {
        let current = self.reg.read(bus);
        (current | self.mask, current & !self.mask)
    }

    /// Drive the signal with a single read-modify-write.
    pub fn set<B: Bus>(&self, bus: &mut B, level: bool) {
        let mask = self.mask;
        self.reg
            .modify(bus, |value| if level { value | mask } else { value & !mask });
    }
}

/// Description of the chip the backdoor runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    timer: Register,
    tx: Signal,
    rx: Signal,
    tick_hz: u32,
}

impl Board {
    /// Mediatek MT1939: LED driver line used as TX, eject button sense used
    /// as RX, 512 KiHz system timer.
    pub const MT1939: Board = Board {
        timer: Register { addr: 0x0400_2078 },
        tx: Signal {
            reg: Register { addr: 0x0400_2088 },
            mask: 1 << 25,
        },
        rx: Signal {
            reg: Register { addr: 0x0400_2084 },
            mask: 1 << 28,
        },
        tick_hz: 512 * 1024,
    };

    pub fn new(timer: Register, tx: Signal, rx: Signal, tick_hz: u32) -> Result<Self> {
        if tick_hz == 0 {
            return Err(Error::InvalidTiming);
        }
        Ok(Self {
            timer,
            tx,
            rx,
            tick_hz,
        })
    }

    /// Free-running tick counter
    pub const fn timer(&self) -> Register {
        self.timer
    }

    /// Transmit line - idles high (mark)
    pub const fn tx(&self) -> Signal {
        self.tx
    }

    /// Receive line - idles high (mark)
    pub const fn rx(&self) -> Signal {
        self.rx
    }

    /// Tick counter frequency in Hz, never zero
    pub const fn tick_hz(&self) -> u32 {
        self.tick_hz
    }
}

/// Masking of interrupts/preemption for a bounded scope.
pub trait Interrupts {
    /// Run `f` with interrupts masked, restoring the previous state after.
    fn free<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// For environments where nothing can preempt the link, such as running
/// from an exception handler with interrupts already masked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterrupts;

impl Interrupts for NoInterrupts {
    fn free<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

/// Cortex-M interrupt masking via PRIMASK.
#[cfg(feature = "cortex-m")]
#[derive(Debug, Clone, Copy, Default)]
pub struct CortexM;

#[cfg(feature = "cortex-m")]
impl Interrupts for CortexM {
    fn free<R>(&self, f: impl FnOnce() -> R) -> R {
        cortex_m::interrupt::free(|_| f())
    }
}

/// Direct volatile access to the whole address space.
#[derive(Clone, Copy)]
pub struct MmioBus;

impl MmioBus {
    /// Create a new MmioBus instance.
    ///
    /// ```rust,ignore
    /// static mut MMIO: MmioBus = unsafe { MmioBus::new() };
    /// ```
    ///
    /// # Safety
    ///
    /// The instance reads, writes and calls whatever addresses it is given,
    /// with no checking.  The caller accepts that the backdoor has unrestricted
    /// access to the machine.
    // We need a new() rather than a default() as it must be const.
    #[allow(clippy::new_without_default)]
    pub const unsafe fn new() -> Self {
        Self {}
    }
}

impl Bus for MmioBus {
    fn read_u32(&mut self, addr: u32) -> u32 {
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }

    fn read_u8(&mut self, addr: u32) -> u8 {
        unsafe { core::ptr::read_volatile(addr as usize as *const u8) }
    }
}

impl NativeCall for MmioBus {
    #[cfg(target_arch = "arm")]
    unsafe fn call(&mut self, address: u32, arg0: u32) -> (u32, u32) {
        let r0: u32;
        let r1: u32;
        unsafe {
            core::arch::asm!(
                "blx {target}",
                target = in(reg) address,
                inlateout("r0") arg0 => r0,
                lateout("r1") r1,
                clobber_abi("C"),
            );
        }
        (r0, r1)
    }

    #[cfg(not(target_arch = "arm"))]
    unsafe fn call(&mut self, address: u32, arg0: u32) -> (u32, u32) {
        // A 64-bit result comes back in the first two return registers.
        let entry: extern "C" fn(u32) -> u64 = unsafe { core::mem::transmute(address as usize) };
        let result = entry(arg0);
        (result as u32, (result >> 32) as u32)
    }
}

// Helper functions

fn check_aligned(addr: u32) -> Result<()> {
    if addr % 4 != 0 {
        Err(Error::NotAligned)
    } else {
        Ok(())
    }
}
