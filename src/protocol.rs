//! Backdoor command protocol.
//!
//! Every command is the sync header `55 FF`, an opcode byte, then the
//! opcode's arguments.  All 32-bit values are little-endian on the wire.
//!
//! | Opcode | Command    | Arguments                  | Response                          |
//! |--------|------------|----------------------------|-----------------------------------|
//! | `F0`   | Peek word  | address                    | word, checksum                    |
//! | `E1`   | Poke word  | address, value             | checksum                          |
//! | `D2`   | Peek byte  | address                    | byte, checksum                    |
//! | `C3`   | Poke byte  | address, value (32-bit)    | checksum                          |
//! | `B4`   | Invoke     | address, arg0              | r0, r1, checksum                  |
//! | `A5`   | Read block | address, count             | `count` words, checksum           |
//! | `96`   | Fill words | address, pattern, count    | checksum                          |
//! | `87`   | Exit       |                            | `55`                              |
//!
//! The trailing checksum is one word, `data ^ address`, where `data` is the
//! last value read or written and `address` the last address used.  For block
//! operations `address` is one word past the last one touched.
//!
//! Poke byte takes a full 32-bit value on the wire and stores a full 32-bit
//! word, despite its name.  Both ends of the protocol depend on this, so it is
//! kept as is.
//!
//! Any other byte where an opcode is expected makes the target re-send its
//! signature and wait for a new sync header.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::{Error, Result};

/// First sync byte
pub const SYNC1: u8 = 0x55;

/// Second sync byte
pub const SYNC2: u8 = 0xFF;

/// Sole response to [`Opcode::Exit`]
pub const EXIT_ACK: u8 = 0x55;

/// Default text announcing the backdoor, sent on start and on every resync.
pub const SIGNATURE: &str = "~MeS`14 [bitbang]\n";

/// Length of the sync header and opcode
pub const HEADER_LEN: usize = 3;

/// Command opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    PeekWord = 0xF0,
    PokeWord = 0xE1,
    PeekByte = 0xD2,
    PokeByte = 0xC3,
    Invoke = 0xB4,
    ReadBlock = 0xA5,
    FillWords = 0x96,
    Exit = 0x87,
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0xF0 => Ok(Opcode::PeekWord),
            0xE1 => Ok(Opcode::PokeWord),
            0xD2 => Ok(Opcode::PeekByte),
            0xC3 => Ok(Opcode::PokeByte),
            0xB4 => Ok(Opcode::Invoke),
            0xA5 => Ok(Opcode::ReadBlock),
            0x96 => Ok(Opcode::FillWords),
            0x87 => Ok(Opcode::Exit),
            _ => Err(Error::UnknownOpcode),
        }
    }
}

/// The trailing checksum sent after every command except Exit.
pub const fn checksum(data: u32, address: u32) -> u32 {
    data ^ address
}

/// A backdoor request, as the host sends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PeekWord { address: u32 },
    PokeWord { address: u32, value: u32 },
    PeekByte { address: u32 },
    PokeByte { address: u32, value: u32 },
    Invoke { address: u32, arg0: u32 },
    ReadBlock { address: u32, count: u32 },
    FillWords { address: u32, pattern: u32, count: u32 },
    Exit,
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::PeekWord { .. } => Opcode::PeekWord,
            Command::PokeWord { .. } => Opcode::PokeWord,
            Command::PeekByte { .. } => Opcode::PeekByte,
            Command::PokeByte { .. } => Opcode::PokeByte,
            Command::Invoke { .. } => Opcode::Invoke,
            Command::ReadBlock { .. } => Opcode::ReadBlock,
            Command::FillWords { .. } => Opcode::FillWords,
            Command::Exit => Opcode::Exit,
        }
    }

    /// Encode the command, including its sync header, into `buf`.
    ///
    /// Returns the number of bytes written.  Each of these bytes must still be
    /// wrapped in a receive envelope (see [`crate::frame::envelope`]) on the
    /// wire.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        let mut args = [0u32; 3];
        let count = match *self {
            Command::PeekWord { address } | Command::PeekByte { address } => {
                args[0] = address;
                1
            }
            Command::PokeWord { address, value } | Command::PokeByte { address, value } => {
                args[..2].copy_from_slice(&[address, value]);
                2
            }
            Command::Invoke { address, arg0 } => {
                args[..2].copy_from_slice(&[address, arg0]);
                2
            }
            Command::ReadBlock { address, count } => {
                args[..2].copy_from_slice(&[address, count]);
                2
            }
            Command::FillWords {
                address,
                pattern,
                count,
            } => {
                args = [address, pattern, count];
                3
            }
            Command::Exit => 0,
        };

        let len = HEADER_LEN + count * 4;
        if buf.len() < len {
            return Err(Error::BufferTooSmall);
        }

        buf[..HEADER_LEN].copy_from_slice(&[SYNC1, SYNC2, self.opcode() as u8]);
        for (chunk, arg) in buf[HEADER_LEN..len].chunks_exact_mut(4).zip(args) {
            chunk.copy_from_slice(&arg.to_le_bytes());
        }

        Ok(len)
    }

    /// Number of bytes the target sends in response, including the checksum.
    pub fn response_len(&self) -> usize {
        match *self {
            Command::PeekWord { .. } => 4 + 4,
            Command::PokeWord { .. } | Command::PokeByte { .. } | Command::FillWords { .. } => 4,
            Command::PeekByte { .. } => 1 + 4,
            Command::Invoke { .. } => 4 + 4 + 4,
            Command::ReadBlock { count, .. } => count as usize * 4 + 4,
            Command::Exit => 1,
        }
    }
}
