//! The bitbang serial link: transmit line driver and receive line sampler.
//!
//! See [`crate`] for an overview, and [`crate::frame`] for the framing used in
//! each direction.
//!
//! A [`Link`] borrows the [`Bus`] that reaches the line's hardware registers
//! for its whole life, like any other long-lived hardware handle.  It
//! implements [`Port`], which is all the dispatcher needs.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod rx;
pub mod tx;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::Result;
use crate::config::{LinkConfig, Timing};
use crate::frame::Envelope;
use crate::hw::{Board, Interrupts, Signal};
use crate::io::{Bus, Port};
use crate::tick::Clock;

/// Bitbang serial link over two borrowed signals.
pub struct Link<'a, B: Bus, I: Interrupts> {
    irq: I,
    wire: Wire<'a, B>,
}

/// Everything touched inside a critical section.
struct Wire<'a, B: Bus> {
    bus: &'a mut B,
    clock: Clock,
    tx: Signal,
    rx: Signal,
    timing: Timing,
    envelope: Envelope,
}

impl<'a, B: Bus, I: Interrupts> Link<'a, B, I> {
    /// Create a new link.
    ///
    /// Arguments:
    /// - `bus` - Object implementing [`Bus`] to reach the timer and line
    ///   registers
    /// - `irq` - Object implementing [`Interrupts`], used to protect each
    ///   byte's bit timing
    /// - `board` - Where the timer and line registers are
    /// - `config` - Link timing
    pub fn new(bus: &'a mut B, irq: I, board: Board, config: LinkConfig) -> Result<Self> {
        let timing = config.timing(board.tick_hz())?;

        debug!(
            "Bitbang link TX {:#010X}/{:#010X} RX {:#010X}/{:#010X} {timing:?}",
            board.tx().reg().addr(),
            board.tx().mask(),
            board.rx().reg().addr(),
            board.rx().mask(),
        );

        Ok(Self {
            irq,
            wire: Wire {
                bus,
                clock: Clock::new(board.timer(), board.tick_hz())?,
                tx: board.tx(),
                rx: board.rx(),
                timing,
                envelope: Envelope::new(),
            },
        })
    }

    pub fn timing(&self) -> Timing {
        self.wire.timing
    }

    pub fn clock(&self) -> Clock {
        self.wire.clock
    }

    /// Drive the transmit line to idle (mark).  Call once before the first
    /// byte if the line may have been left low.
    pub fn idle(&mut self) {
        self.wire.tx.set(self.wire.bus, true);
    }
}

impl<B: Bus, I: Interrupts> Port for Link<'_, B, I> {
    fn read_byte(&mut self) -> u8 {
        Link::read_byte(self)
    }

    fn send_byte(&mut self, byte: u8) {
        Link::send_byte(self, byte)
    }
}
