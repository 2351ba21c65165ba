//! Bare-metal debug backdoor over a software-timed serial line.
//!
//! This crate lets an external operator read and write arbitrary memory, and
//! call arbitrary code, on a microcontroller using nothing but two generic
//! signal lines the backdoor does not own: an output (for example an LED
//! driver) used to transmit, and an input (for example a button sense line)
//! used to receive.  There is no hardware UART, no interrupt handler and no
//! cooperation from the firmware already running on the target.
//!
//! `no_std`, no `alloc`.
//!
//! ## Architecture
//!
//! Everything runs on one thread of control, busy-waiting throughout:
//!
//! - **Tick source** ([`tick`]) - a free-running hardware counter.  All
//!   elapsed-time comparisons use wraparound-safe signed subtraction.
//! - **Transmit line driver** ([`link`]) - emits plain 8-N-1 frames by
//!   read-modify-write of one bit in a shared register.
//! - **Receive line sampler** ([`link`]) - polls one bit of a shared register
//!   and recovers bytes using a self-resynchronizing envelope (see
//!   [`frame::Envelope`]).
//! - **Command dispatcher** ([`backdoor`]) - a state machine which consumes
//!   received bytes, executes one of a fixed set of memory/code operations,
//!   and responds over the transmit line.
//!
//! Each byte sent or received runs inside a scoped critical section (see
//! [`hw::Interrupts`]), so ordinary interrupts may run between bytes but never
//! in the middle of bit timing.
//!
//! ## Wire format
//!
//! Target to host: plain 8-N-1 frames at 57600 baud.
//!
//! Host to target: every payload byte must be sent as an envelope of one or
//! more `0xFF` training bytes, exactly one `0x00` delimiter byte, then the
//! payload byte, each individually 8-N-1 framed.  The receiver never returns a
//! byte unless it has seen a complete, correctly framed envelope, and any line
//! noise is absorbed until the next clean envelope arrives.
//!
//! Commands are `55 FF <opcode> <arguments>`, 32-bit values little-endian.
//! See [`protocol`] for the opcode table and [`backdoor`] for the dispatcher.
//!
//! ## Modules
//!
//! - [`hw`] - Typed register descriptors, the board description, raw memory
//!   access and interrupt masking
//! - [`io`] - Capability traits: memory [`io::Bus`], native code
//!   [`io::NativeCall`] and byte-level serial [`io::Port`]
//! - [`tick`] - Tick counter arithmetic and busy-wait delays
//! - [`config`] - Link timing configuration
//! - [`frame`] - Framing helpers shared by both directions
//! - [`link`] - The bitbang serial link itself
//! - [`protocol`] - Opcodes, command encoding and the checksum convention
//! - [`backdoor`] - The command dispatcher
//! - [`console`] - Draining an in-RAM diagnostics ring buffer over the link
//!
//! ## Getting Started
//!
//! ```rust,ignore
//! use bitbang_backdoor::backdoor::Backdoor;
//! use bitbang_backdoor::config::LinkConfig;
//! use bitbang_backdoor::hw::{Board, CortexM, MmioBus};
//! use bitbang_backdoor::link::Link;
//!
//! // Safety: the backdoor is given unrestricted access to the address space.
//! let mut line_bus = unsafe { MmioBus::new() };
//! let mut memory = unsafe { MmioBus::new() };
//!
//! let mut link = Link::new(&mut line_bus, CortexM, Board::MT1939, LinkConfig::default())?;
//! link.idle();
//! Backdoor::new(&mut link, &mut memory).run();
//! // Control returns here once the host sends the Exit command.
//! ```
//!
//! ## Features
//!
//! - `cortex-m` - Provide [`hw::CortexM`], masking interrupts using the
//!   `cortex-m` crate.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#![cfg_attr(not(test), no_std)]

pub mod backdoor;
pub mod config;
pub mod console;
pub mod frame;
pub mod hw;
pub mod io;
pub mod link;
pub mod protocol;
pub mod tick;

#[cfg(test)]
mod sim;

/// Backdoor errors.
///
/// These only arise when describing hardware, resolving configuration, or
/// encoding/decoding protocol values.  The running link and dispatcher have
/// no failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Register or buffer address not word aligned
    NotAligned,
    /// Signal mask does not select exactly one bit
    InvalidMask,
    /// Baud rate, bit period or sample offset cannot be realized
    InvalidTiming,
    /// Byte is not one of the protocol opcodes
    UnknownOpcode,
    /// Buffer too small for operation
    BufferTooSmall,
}

/// Type to represent the result of a backdoor operation
pub type Result<T> = core::result::Result<T, Error>;
