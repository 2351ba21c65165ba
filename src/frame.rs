//! Framing shared by both directions of the link.
//!
//! # 8-N-1 frames
//!
//! Every byte on the wire, in either direction, is one start bit (space, low),
//! eight data bits LSB first, and one stop bit (mark, high).  [`frame()`]
//! returns those ten bits with the first bit on the wire in bit 0.
//!
//! # Receive envelope
//!
//! With no UART and no interrupts, a receiver which misses a single start
//! edge could otherwise stay misaligned with byte boundaries indefinitely.  So
//! in the host to target direction each payload byte is wrapped:
//!
//! ```text
//! FF .. FF 00 <payload>
//! ```
//!
//! one or more training bytes, one delimiter byte, then the payload, all
//! framed as ordinary 8-N-1 bytes back to back.  The receiver keeps a rolling
//! history of the bits it has sampled (see [`Envelope`]) and only accepts a
//! payload once the history ends with exactly:
//!
//! ```text
//! start 11111111 stop start 00000000 stop start <payload> stop
//! ```
//!
//! Training bytes have a single low bit, so a receiver that has lost its place
//! realigns on their start bits, and the `0x00` delimiter cannot be mistaken
//! for training.  Anything else on the line is simply shifted through the
//! history and forgotten.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

/// Bits in an 8-N-1 frame
pub const FRAME_BITS: u32 = 10;

/// Training byte preceding the delimiter
pub const TRAINING: u8 = 0xFF;

/// Delimiter byte preceding the payload
pub const DELIMITER: u8 = 0x00;

/// Bits sampled after each start edge: eight data bits and the stop bit.
pub const GROUP_BITS: u32 = FRAME_BITS - 1;

/// Bits of history compared: training, delimiter and payload frames.
pub const HISTORY_BITS: u32 = 3 * FRAME_BITS;

/// Position of the newest bit in the history.
pub const NEWEST_BIT: u32 = HISTORY_BITS - 1;

/// History bits checked: training and delimiter frames, payload start and
/// stop bits.
pub const ENVELOPE_MASK: u32 = 0x201F_FFFF;

/// Expected value of the checked history bits.
pub const ENVELOPE_MATCH: u32 = 0x2008_03FE;

/// Shift taking the payload's data bits to bits 0..8.
pub const PAYLOAD_SHIFT: u32 = 2 * FRAME_BITS + 1;

/// History after a payload has been accepted: as if a training frame had just
/// been received.
const IDLE_HISTORY: u32 = (frame(TRAINING) as u32) << (2 * FRAME_BITS);

/// The 8-N-1 frame for `byte`, first bit on the wire in bit 0.
pub const fn frame(byte: u8) -> u16 {
    ((byte as u16) | 0x100) << 1
}

/// Host side: the bytes to send on the wire to deliver `byte`, preceded by
/// `training` training bytes.
pub fn envelope(byte: u8, training: usize) -> impl Iterator<Item = u8> {
    core::iter::repeat_n(TRAINING, training).chain([DELIMITER, byte])
}

/// Rolling bit history used by the receiver to recognise a complete envelope.
///
/// The oldest bit is in bit 0, and each new bit enters at [`NEWEST_BIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    shift: u32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    pub const fn new() -> Self {
        Self {
            shift: IDLE_HISTORY,
        }
    }

    /// Shift in one sampled bit.  Returns the payload once the history ends
    /// with a complete envelope.
    pub fn push(&mut self, bit: bool) -> Option<u8> {
        self.shift = (self.shift >> 1) | ((bit as u32) << NEWEST_BIT);
        if self.shift & ENVELOPE_MASK == ENVELOPE_MATCH {
            let byte = (self.shift >> PAYLOAD_SHIFT) as u8;
            self.shift = IDLE_HISTORY;
            Some(byte)
        } else {
            None
        }
    }

    pub const fn history(&self) -> u32 {
        self.shift
    }
}

/// Bits of `byte`'s frame in wire order.
pub fn frame_bits(byte: u8) -> impl Iterator<Item = bool> {
    let frame = frame(byte);
    (0..FRAME_BITS).map(move |bit| frame & (1 << bit) != 0)
}
