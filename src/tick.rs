//! Tick source.
//!
//! The hardware provides a free-running 32-bit counter which wraps.  Elapsed
//! time is always computed as a signed difference, `(now - reference) as i32`,
//! never by ordering or unsigned subtraction, so every comparison here stays
//! correct across the wrap.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::hw::Register;
use crate::io::Bus;
use crate::{Error, Result};

/// Longest wait a single deadline can express
const MAX_SPAN: u32 = i32::MAX as u32;

/// One reading of the tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticks(pub u32);

impl Ticks {
    pub const fn wrapping_add(self, ticks: u32) -> Self {
        Self(self.0.wrapping_add(ticks))
    }

    /// Signed number of ticks from `earlier` to `self`.
    pub const fn since(self, earlier: Ticks) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    /// Whether `self` is at or after `deadline`.
    pub const fn reached(self, deadline: Ticks) -> bool {
        self.since(deadline) >= 0
    }
}

/// The tick counter register and its frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    timer: Register,
    hz: u32,
}

impl Clock {
    /// Create a clock reading `timer`, which counts at `hz`.  `hz` must not
    /// be zero.
    pub fn new(timer: Register, hz: u32) -> Result<Self> {
        if hz == 0 {
            return Err(Error::InvalidTiming);
        }
        Ok(Self { timer, hz })
    }

    pub const fn hz(&self) -> u32 {
        self.hz
    }

    pub fn now<B: Bus>(&self, bus: &mut B) -> Ticks {
        Ticks(self.timer.read(bus))
    }

    /// Spin until the counter reaches `deadline`.
    pub fn wait_until<B: Bus>(&self, bus: &mut B, deadline: Ticks) {
        while !self.now(bus).reached(deadline) {}
    }

    /// Spin for at least `ticks` whole tick periods.
    pub fn wait_ticks<B: Bus>(&self, bus: &mut B, ticks: u32) {
        self.wait_span(bus, ticks as u64 + 1);
    }

    /// Spin for at least `ms` milliseconds, which may be longer than the
    /// counter takes to wrap.
    pub fn wait_ms<B: Bus>(&self, bus: &mut B, ms: u32) {
        self.wait_span(bus, ms as u64 * self.hz as u64 / 1000 + 1);
    }

    pub fn seconds(&self, ticks: Ticks) -> u32 {
        ticks.0 / self.hz
    }

    /// Counter value in milliseconds.  The tick rate need not be a whole
    /// number of ticks per millisecond.
    pub fn millis(&self, ticks: Ticks) -> u32 {
        (ticks.0 as u64 * 1000 / self.hz as u64) as u32
    }

    pub fn micros(&self, ticks: Ticks) -> u32 {
        (ticks.0 as u64 * 1_000_000 / self.hz as u64) as u32
    }
}

// Internal functions
impl Clock {
    // Deadlines more than MAX_SPAN ahead look like the past, so chain them
    fn wait_span<B: Bus>(&self, bus: &mut B, mut ticks: u64) {
        let mut deadline = self.now(bus);
        while ticks > 0 {
            let step = ticks.min(MAX_SPAN as u64) as u32;
            deadline = deadline.wrapping_add(step);
            self.wait_until(bus, deadline);
            ticks -= step as u64;
        }
    }
}
