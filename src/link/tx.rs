//! Transmit line driver.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::frame::{FRAME_BITS, frame};
use crate::hw::Interrupts;
use crate::io::Bus;
use crate::link::{Link, Wire};

impl<B: Bus, I: Interrupts> Link<'_, B, I> {
    /// Transmit one 8-N-1 frame, returning once the stop bit has been held
    /// for a full bit period.
    ///
    /// Runs with interrupts masked throughout, as any delay mid-byte corrupts
    /// the bit timing seen by the host.
    pub fn send_byte(&mut self, byte: u8) {
        self.irq.free(|| self.wire.transmit_frame(byte));
    }
}

impl<B: Bus> Wire<'_, B> {
    fn transmit_frame(&mut self, byte: u8) {
        // The register is shared, so sample it once per byte rather than
        // once per bit
        let (mark, space) = self.tx.levels(self.bus);
        let reg = self.tx.reg();

        let mut bits = frame(byte);
        let mut deadline = self.clock.now(self.bus);
        for _ in 0..FRAME_BITS {
            reg.write(self.bus, if bits & 1 != 0 { mark } else { space });
            bits >>= 1;

            deadline = deadline.wrapping_add(self.timing.tx_bit_ticks);
            self.clock.wait_until(self.bus, deadline);
        }
    }
}
