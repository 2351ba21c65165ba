//! Simulated hardware for tests.
//!
//! [`SimLine`] models the line registers with a tick counter that advances by
//! one on every register access, so busy-wait loops make progress and the
//! timing seen by the link is deterministic.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::vec::Vec;

use crate::frame::FRAME_BITS;
use crate::hw::{Board, Interrupts};
use crate::io::{Bus, NativeCall, Port};

/// One write to the transmit register.
#[derive(Debug, Clone, Copy)]
pub struct TxWrite {
    pub at: u32,
    pub value: u32,
    pub level: bool,
    pub masked: bool,
}

/// One read of the receive register.
#[derive(Debug, Clone, Copy)]
pub struct RxRead {
    pub at: u32,
    pub masked: bool,
}

/// Timer, transmit and receive registers of a [`Board`].
pub struct SimLine {
    board: Board,
    now: u32,
    rx: Vec<(u32, bool)>,
    tx_reg: u32,
    tx_writes: Vec<TxWrite>,
    rx_reads: Vec<RxRead>,
    irq_masked: Option<Rc<Cell<bool>>>,
}

impl SimLine {
    pub fn new(board: Board, now: u32) -> Self {
        Self {
            board,
            now,
            rx: Vec::new(),
            tx_reg: board.tx().mask(),
            tx_writes: Vec::new(),
            rx_reads: Vec::new(),
            irq_masked: None,
        }
    }

    /// Receive line transitions as `(tick, level)`, in time order.  The line
    /// idles high before the first.
    pub fn set_rx(&mut self, transitions: Vec<(u32, bool)>) {
        self.rx = transitions;
    }

    pub fn set_tx_register(&mut self, value: u32) {
        self.tx_reg = value;
    }

    /// Record whether `irq` had interrupts masked at each transmit write and
    /// receive read.
    pub fn watch_irq(&mut self, irq: &SimIrq) {
        self.irq_masked = Some(irq.masked.clone());
    }

    pub fn tx_writes(&self) -> &[TxWrite] {
        &self.tx_writes
    }

    pub fn rx_reads(&self) -> &[RxRead] {
        &self.rx_reads
    }

    /// The transmit line as receive transitions for another [`SimLine`].
    pub fn tx_waveform(&self) -> Vec<(u32, bool)> {
        self.tx_writes
            .iter()
            .map(|write| (write.at, write.level))
            .collect()
    }

    fn tick(&mut self) -> u32 {
        let at = self.now;
        self.now = self.now.wrapping_add(1);
        at
    }

    fn irq_masked(&self) -> bool {
        self.irq_masked.as_ref().is_some_and(|masked| masked.get())
    }

    fn rx_level(&self, at: u32) -> bool {
        self.rx
            .iter()
            .take_while(|(tick, _)| at.wrapping_sub(*tick) as i32 >= 0)
            .last()
            .is_none_or(|&(_, level)| level)
    }
}

impl Bus for SimLine {
    fn read_u32(&mut self, addr: u32) -> u32 {
        let at = self.tick();
        if addr == self.board.timer().addr() {
            at
        } else if addr == self.board.rx().reg().addr() {
            self.rx_reads.push(RxRead {
                at,
                masked: self.irq_masked(),
            });
            // Unrelated bits of the shared register
            let other = 0x0000_0F0F & !self.board.rx().mask();
            if self.rx_level(at) {
                other | self.board.rx().mask()
            } else {
                other
            }
        } else if addr == self.board.tx().reg().addr() {
            self.tx_reg
        } else {
            0
        }
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        let at = self.tick();
        if addr == self.board.tx().reg().addr() {
            self.tx_reg = value;
            self.tx_writes.push(TxWrite {
                at,
                value,
                level: value & self.board.tx().mask() != 0,
                masked: self.irq_masked(),
            });
        }
    }

    fn read_u8(&mut self, addr: u32) -> u8 {
        (self.read_u32(addr & !3) >> ((addr & 3) * 8)) as u8
    }
}

/// Interrupt masking which records critical sections.
pub struct SimIrq {
    masked: Rc<Cell<bool>>,
    sections: Rc<Cell<u32>>,
}

impl SimIrq {
    pub fn new() -> Self {
        Self {
            masked: Rc::new(Cell::new(false)),
            sections: Rc::new(Cell::new(0)),
        }
    }

    /// Count of critical sections entered so far.
    pub fn sections(&self) -> Rc<Cell<u32>> {
        self.sections.clone()
    }
}

impl Interrupts for SimIrq {
    fn free<R>(&self, f: impl FnOnce() -> R) -> R {
        assert!(!self.masked.get(), "nested critical section");
        self.masked.set(true);
        self.sections.set(self.sections.get() + 1);
        let result = f();
        self.masked.set(false);
        result
    }
}

/// Sparse little-endian memory.  Unwritten bytes read as zero.
pub struct SimMemory {
    bytes: BTreeMap<u32, u8>,
    calls: Vec<(u32, u32)>,
    callee: fn(u32, u32) -> (u32, u32),
}

impl SimMemory {
    pub fn new() -> Self {
        Self {
            bytes: BTreeMap::new(),
            calls: Vec::new(),
            callee: |address, arg0| (arg0.wrapping_add(1), address),
        }
    }

    /// Set what native calls return, given `(address, arg0)`.
    pub fn set_callee(&mut self, callee: fn(u32, u32) -> (u32, u32)) {
        self.callee = callee;
    }

    /// Native calls made so far, as `(address, arg0)`.
    pub fn calls(&self) -> &[(u32, u32)] {
        &self.calls
    }

    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            self.bytes.insert(addr.wrapping_add(offset as u32), byte);
        }
    }
}

impl Bus for SimMemory {
    fn read_u32(&mut self, addr: u32) -> u32 {
        let mut bytes = [0u8; 4];
        for (offset, byte) in bytes.iter_mut().enumerate() {
            *byte = self.read_u8(addr.wrapping_add(offset as u32));
        }
        u32::from_le_bytes(bytes)
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    fn read_u8(&mut self, addr: u32) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }
}

impl NativeCall for SimMemory {
    unsafe fn call(&mut self, address: u32, arg0: u32) -> (u32, u32) {
        self.calls.push((address, arg0));
        (self.callee)(address, arg0)
    }
}

/// Byte-level port fed from a script.
pub struct ScriptPort {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptPort {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.output)
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl Port for ScriptPort {
    fn read_byte(&mut self) -> u8 {
        self.input.pop_front().expect("script exhausted")
    }

    fn send_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }
}

/// Receive transitions for `bits` sent at `bit_ticks` per bit from `start`.
pub fn waveform(start: u32, bit_ticks: u32, bits: impl Iterator<Item = bool>) -> Vec<(u32, bool)> {
    bits.enumerate()
        .map(|(index, bit)| (start.wrapping_add(index as u32 * bit_ticks), bit))
        .collect()
}

/// Decode transmit writes, ten per frame, checking start and stop bits.
pub fn decode_frames(writes: &[TxWrite]) -> Vec<u8> {
    assert_eq!(writes.len() % FRAME_BITS as usize, 0, "partial frame");
    writes
        .chunks(FRAME_BITS as usize)
        .map(|frame| {
            assert!(!frame[0].level, "start bit");
            assert!(frame[9].level, "stop bit");
            frame[1..9]
                .iter()
                .enumerate()
                .fold(0u8, |byte, (bit, write)| byte | ((write.level as u8) << bit))
        })
        .collect()
}
