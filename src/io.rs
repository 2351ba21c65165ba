//! Capability traits used by the link and the dispatcher.
//!
//! This module contains the seams between the backdoor and the machine it
//! runs on:
//!
//! - [`Bus`] - raw reads and writes at absolute addresses, used both for the
//!   hardware registers driving the line and for the memory operations the
//!   host requests
//! - [`NativeCall`] - calling native code at an arbitrary address
//! - [`Port`] - a byte-level serial port, implemented by
//!   [`crate::link::Link`] and consumed by [`crate::backdoor::Backdoor`]
//!
//! # Possible implementations
//!
//! - On the target: [`crate::hw::MmioBus`], which performs volatile accesses
//!   to the real address space
//! - In tests: simulated hardware, with a tick counter that advances on every
//!   register access
//!
//! # Address Space
//!
//! Addresses are absolute 32-bit addresses as they appear in the target's
//! memory map.  There is no bounds checking.  Accessing an invalid address
//! does whatever the platform does on an invalid access.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

/// Memory and register access.
pub trait Bus {
    /// Read a 32-bit word at the specified absolute address.
    fn read_u32(&mut self, addr: u32) -> u32;

    /// Write a 32-bit word to the specified absolute address.
    fn write_u32(&mut self, addr: u32, value: u32);

    /// Read a single byte at the specified absolute address.
    fn read_u8(&mut self, addr: u32) -> u8;
}

/// Native code invocation.
///
/// This is deliberately the only way the backdoor escapes the type system to
/// run code: one function, one argument, two results.
pub trait NativeCall {
    /// Call the code at `address` with `arg0` in the first argument register.
    ///
    /// Returns the contents of the first two argument/return registers after
    /// the callee returns (`r0` and `r1` on ARM).
    ///
    /// # Safety
    ///
    /// There are no guarantees at all about what the callee does.  `address`
    /// must point at code following the platform's C calling convention (with
    /// the Thumb bit set where relevant) or the behaviour is undefined.
    unsafe fn call(&mut self, address: u32, arg0: u32) -> (u32, u32);
}

/// Byte-level serial port.
///
/// Both primitives block, and neither can fail.  A caller needing a timeout
/// must bound its own use of [`Port::read_byte`].
pub trait Port {
    /// Block until one correctly framed byte has been received.
    fn read_byte(&mut self) -> u8;

    /// Transmit one byte, returning once its stop bit has been held.
    fn send_byte(&mut self, byte: u8);

    /// Read one little-endian 32-bit word.
    fn read_word32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        for byte in bytes.iter_mut() {
            *byte = self.read_byte();
        }
        u32::from_le_bytes(bytes)
    }

    /// Transmit one little-endian 32-bit word.
    fn send_word32(&mut self, word: u32) {
        for byte in word.to_le_bytes() {
            self.send_byte(byte);
        }
    }

    /// Transmit one text character, translating `\n` to `\r\n` for terminals.
    fn send_char(&mut self, byte: u8) {
        if byte == b'\n' {
            self.send_byte(b'\r');
        }
        self.send_byte(byte);
    }

    /// Transmit text up to its end or the first NUL terminator.
    fn send_str(&mut self, text: &str) {
        for byte in text.bytes().take_while(|&byte| byte != 0) {
            self.send_char(byte);
        }
    }
}
