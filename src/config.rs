//! Link timing configuration.
//!
//! The transmit bit period is derived from the tick frequency and the baud
//! rate.  The receive side is configured directly in ticks, as it depends on
//! how quickly the sampler's polling loop runs as well as on the line rate.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::{Error, Result};

/// Shortest usable bit period, in ticks.
pub const MIN_BIT_TICKS: u32 = 2;

/// Configuration for a [`crate::link::Link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Transmit symbol rate
    pub baud: u32,
    /// Receive bit period in ticks
    pub rx_bit_ticks: u32,
    /// Ticks from detecting a start edge to the first sampling deadline
    pub rx_sample_offset: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud: 57600,
            rx_bit_ticks: 9,
            rx_sample_offset: 2,
        }
    }
}

impl LinkConfig {
    /// Resolve this configuration against a tick frequency.
    pub fn timing(&self, tick_hz: u32) -> Result<Timing> {
        if self.baud == 0 {
            return Err(Error::InvalidTiming);
        }

        // Round to the nearest whole tick
        let tx_bit_ticks = (tick_hz as u64 + self.baud as u64 / 2) / self.baud as u64;
        if tx_bit_ticks < MIN_BIT_TICKS as u64 || tx_bit_ticks > u16::MAX as u64 {
            return Err(Error::InvalidTiming);
        }

        if self.rx_bit_ticks < MIN_BIT_TICKS || self.rx_sample_offset >= self.rx_bit_ticks {
            return Err(Error::InvalidTiming);
        }

        Ok(Timing {
            tx_bit_ticks: tx_bit_ticks as u32,
            rx_bit_ticks: self.rx_bit_ticks,
            rx_sample_offset: self.rx_sample_offset,
        })
    }
}

/// Resolved bit timing, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub tx_bit_ticks: u32,
    pub rx_bit_ticks: u32,
    pub rx_sample_offset: u32,
}
