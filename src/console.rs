//! Draining an in-RAM diagnostics ring buffer over the link.
//!
//! The firmware under investigation (or code the host has loaded into it) may
//! log human-readable text into a ring buffer in RAM, laid out as:
//!
//! | Offset    | Field        |                                         |
//! |-----------|--------------|-----------------------------------------|
//! | `0x00000` | `bytes`      | 64 KiB of text                          |
//! | `0x10000` | `next_write` | Updated by the writer after every byte  |
//! | `0x10004` | `next_read`  | Only used by readers, such as this one  |
//!
//! Both indices count bytes written or read and are used modulo 64 KiB.
//! [`ConsoleRing::drain()`] sends any unread text out of a [`Port`] and moves
//! `next_read` on.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::{Bus, Port};
use crate::{Error, Result};

/// Console ring buffer in target memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleRing {
    base: u32,
}

impl ConsoleRing {
    /// Size of the text area in bytes
    pub const DATA_SIZE: u32 = 0x1_0000;

    pub const fn next_write_offset() -> u32 {
        Self::DATA_SIZE
    }

    pub const fn next_read_offset() -> u32 {
        Self::DATA_SIZE + 4
    }

    /// Describe a ring buffer at `base`, which must be word aligned.  The
    /// indices follow the text area, wrapping around the address space.
    pub fn new(base: u32) -> Result<Self> {
        if base % 4 != 0 {
            return Err(Error::NotAligned);
        }
        Ok(Self { base })
    }

    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Number of bytes written but not yet read.
    pub fn pending<B: Bus>(&self, bus: &mut B) -> usize {
        let write = self.read_next_write(bus);
        let read = self.read_next_read(bus) as u16;
        write.wrapping_sub(read) as usize
    }

    /// Send all unread text to `port`, translating `\n` to `\r\n`.
    ///
    /// Returns the number of bytes taken from the ring.
    pub fn drain<B: Bus, P: Port>(&self, bus: &mut B, port: &mut P) -> usize {
        let write = self.read_next_write(bus);
        let mut read = self.read_next_read(bus);
        let mut count = 0;

        while write != read as u16 {
            let byte = bus.read_u8(self.base.wrapping_add((read as u16) as u32));
            port.send_char(byte);
            read = read.wrapping_add(1);
            count += 1;
        }

        bus.write_u32(self.base.wrapping_add(Self::next_read_offset()), read);
        trace!("Drained {count} console bytes");
        count
    }
}

// Internal functions
impl ConsoleRing {
    fn read_next_write<B: Bus>(&self, bus: &mut B) -> u16 {
        // Snapshot once, the writer may keep going while we drain
        bus.read_u32(self.base.wrapping_add(Self::next_write_offset())) as u16
    }

    fn read_next_read<B: Bus>(&self, bus: &mut B) -> u32 {
        bus.read_u32(self.base.wrapping_add(Self::next_read_offset()))
    }
}
