//! Command dispatcher.
//!
//! A single always-looping state machine which reads bytes from a [`Port`],
//! runs the requested memory or code operation against a [`Bus`] and
//! [`NativeCall`], and responds on the same port.  See [`crate::protocol`] for
//! the command set.
//!
//! The sync and opcode handling is a transition table, [`RULES`].  Any byte
//! without a rule of its own takes the state back to [`State::AwaitSync1`] and
//! re-sends the signature; nothing is ever reported as an error.
//!
//! Commands run to completion once started.  The only way out of
//! [`Backdoor::run()`] is the Exit command.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::{Bus, NativeCall, Port};
use crate::protocol::{EXIT_ACK, Opcode, SIGNATURE, SYNC1, SYNC2, checksum};

/// Dispatcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitSync1,
    AwaitSync2,
    AwaitOpcode,
    Executing,
    SendChecksum,
}

/// Whether the dispatcher loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Bytes a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum On {
    Byte(u8),
    Opcode,
}

/// What a rule does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Then {
    Goto(State),
    Execute,
}

/// Transition table.  The first rule matching the current state and received
/// byte applies.  Anything unmatched resyncs.
pub const RULES: [(State, On, Then); 4] = [
    (State::AwaitSync1, On::Byte(SYNC1), Then::Goto(State::AwaitSync2)),
    (State::AwaitSync2, On::Byte(SYNC2), Then::Goto(State::AwaitOpcode)),
    (State::AwaitSync2, On::Byte(SYNC1), Then::Goto(State::AwaitSync2)),
    (State::AwaitOpcode, On::Opcode, Then::Execute),
];

impl On {
    fn matches(&self, byte: u8) -> bool {
        match *self {
            On::Byte(expected) => byte == expected,
            On::Opcode => Opcode::try_from(byte).is_ok(),
        }
    }
}

/// Look up the rule for `byte` in `state`, or `None` to resync.
pub fn transition(state: State, byte: u8) -> Option<Then> {
    RULES
        .iter()
        .find(|(from, on, _)| *from == state && on.matches(byte))
        .map(|&(_, _, then)| then)
}

/// The backdoor.
///
/// Arguments:
/// - `port` - Where commands arrive and responses go, normally a
///   [`crate::link::Link`]
/// - `memory` - What commands operate on, normally [`crate::hw::MmioBus`]
pub struct Backdoor<'a, P: Port, M: Bus + NativeCall> {
    port: &'a mut P,
    memory: &'a mut M,
    signature: &'a str,
    state: State,
    // Last data value and address used, for the trailing checksum
    data: u32,
    address: u32,
}

impl<'a, P: Port, M: Bus + NativeCall> Backdoor<'a, P, M> {
    pub fn new(port: &'a mut P, memory: &'a mut M) -> Self {
        Self {
            port,
            memory,
            signature: SIGNATURE,
            state: State::AwaitSync1,
            data: 0,
            address: 0,
        }
    }

    /// Replace the signature text sent on start and on every resync.
    pub fn with_signature(mut self, signature: &'a str) -> Self {
        self.signature = signature;
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Announce the backdoor, then serve commands until Exit.
    pub fn run(&mut self) {
        info!("Backdoor started");
        self.resync();
        while self.step() == Flow::Continue {}
        info!("Backdoor exited");
    }

    /// Consume one byte from the port, and if it completes a sync header and
    /// opcode, the whole command.
    pub fn step(&mut self) -> Flow {
        let byte = self.port.read_byte();
        match transition(self.state, byte) {
            Some(Then::Goto(state)) => {
                self.state = state;
                Flow::Continue
            }
            Some(Then::Execute) => match Opcode::try_from(byte) {
                Ok(opcode) => self.execute(opcode),
                Err(_) => {
                    self.resync();
                    Flow::Continue
                }
            },
            None => {
                trace!("Resync on {byte:#04X} in {:?}", self.state);
                self.resync();
                Flow::Continue
            }
        }
    }
}

// Internal functions
impl<P: Port, M: Bus + NativeCall> Backdoor<'_, P, M> {
    fn resync(&mut self) {
        self.port.send_str(self.signature);
        self.state = State::AwaitSync1;
    }

    fn execute(&mut self, opcode: Opcode) -> Flow {
        self.state = State::Executing;

        match opcode {
            Opcode::PeekWord => {
                self.address = self.port.read_word32();
                self.data = self.memory.read_u32(self.address);
                self.port.send_word32(self.data);
                debug!("Peek {:#010X} = {:#010X}", self.address, self.data);
            }
            Opcode::PokeWord => {
                self.address = self.port.read_word32();
                self.data = self.port.read_word32();
                self.memory.write_u32(self.address, self.data);
                debug!("Poke {:#010X} = {:#010X}", self.address, self.data);
            }
            Opcode::PeekByte => {
                self.address = self.port.read_word32();
                let byte = self.memory.read_u8(self.address);
                self.data = byte as u32;
                self.port.send_byte(byte);
                debug!("Peek byte {:#010X} = {byte:#04X}", self.address);
            }
            Opcode::PokeByte => {
                // Takes and stores a full word
                self.address = self.port.read_word32();
                self.data = self.port.read_word32();
                self.memory.write_u32(self.address, self.data);
                debug!("Poke byte {:#010X} = {:#010X}", self.address, self.data);
            }
            Opcode::Invoke => {
                self.address = self.port.read_word32();
                let arg0 = self.port.read_word32();
                debug!("Invoke {:#010X} ({arg0:#010X})", self.address);
                // SAFETY: calling arbitrary code is what the operator asked
                // for, and there is no way to check it.
                let (r0, r1) = unsafe { self.memory.call(self.address, arg0) };
                self.data = r0;
                self.port.send_word32(r0);
                self.port.send_word32(r1);
                debug!("Invoke returned {r0:#010X} {r1:#010X}");
            }
            Opcode::ReadBlock => {
                self.address = self.port.read_word32();
                let count = self.port.read_word32();
                debug!("Read block {:#010X} x {count}", self.address);
                for _ in 0..count {
                    self.data = self.memory.read_u32(self.address);
                    self.port.send_word32(self.data);
                    self.address = self.address.wrapping_add(4);
                }
            }
            Opcode::FillWords => {
                self.address = self.port.read_word32();
                self.data = self.port.read_word32();
                let count = self.port.read_word32();
                debug!(
                    "Fill {:#010X} x {count} with {:#010X}",
                    self.address, self.data
                );
                for _ in 0..count {
                    self.memory.write_u32(self.address, self.data);
                    self.address = self.address.wrapping_add(4);
                }
            }
            Opcode::Exit => {
                self.port.send_byte(EXIT_ACK);
                self.state = State::AwaitSync1;
                return Flow::Exit;
            }
        }

        self.state = State::SendChecksum;
        self.port.send_word32(checksum(self.data, self.address));
        self.state = State::AwaitSync1;
        Flow::Continue
    }
}
