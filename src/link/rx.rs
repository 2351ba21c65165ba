//! Receive line sampler.
//!
//! The sampler busy-polls for a start edge, then samples the following nine
//! bits (eight data bits and the stop bit) at mid-bit.  It does not decide
//! where bytes begin and end: every bit, including the start bit implied by
//! the edge, goes into the rolling [`Envelope`](crate::frame::Envelope)
//! history, which is checked after each bit.  A missed or false start edge
//! just puts some garbage through the history, and the next training byte's
//! start bit realigns the sampler.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::frame::GROUP_BITS;
use crate::hw::Interrupts;
use crate::io::Bus;
use crate::link::{Link, Wire};

impl<B: Bus, I: Interrupts> Link<'_, B, I> {
    /// Block until one correctly framed payload byte has been received.
    ///
    /// Never times out and never returns a malformed byte.  Interrupts are
    /// masked while waiting for each start edge and sampling the bits after
    /// it, and unmasked briefly between groups.
    pub fn read_byte(&mut self) -> u8 {
        loop {
            if let Some(byte) = self.irq.free(|| self.wire.sample_group()) {
                return byte;
            }
        }
    }
}

impl<B: Bus> Wire<'_, B> {
    fn sample_group(&mut self) -> Option<u8> {
        while self.rx.is_set(self.bus) {}

        let mut deadline = self
            .clock
            .now(self.bus)
            .wrapping_add(self.timing.rx_sample_offset);
        if let Some(byte) = self.envelope.push(false) {
            return Some(byte);
        }

        for _ in 0..GROUP_BITS {
            deadline = deadline.wrapping_add(self.timing.rx_bit_ticks);
            self.clock.wait_until(self.bus, deadline);

            let bit = self.rx.is_set(self.bus);
            if let Some(byte) = self.envelope.push(bit) {
                return Some(byte);
            }
        }

        None
    }
}
