//! Device handles for the tuner board.
//!
//! Each physical resource gets exactly one owned handle, created at startup
//! and passed to whoever needs it. Nothing here is global.

#[cfg(target_os = "linux")]
pub mod linux;
pub mod mcp3008;
pub mod pcf8574;
pub mod pins;

pub use mcp3008::Mcp3008;
pub use pcf8574::{Pcf8574, Pcf8574Indicator};
pub use pins::{PinMonitor, DEFAULT_WATCHED_PINS};

use crate::{Result, TunerError};

/// Number of single-ended inputs on the converter.
pub const ADC_CHANNELS: u8 = 8;

/// A fresh sample from the analog front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub value: u16,
    /// State of the physical on/off switch.
    pub enabled: bool,
}

/// Produces raw 10-bit samples and the state of the enable switch.
pub trait AnalogSource {
    /// Reads one raw sample from `channel`. Channels outside `0..=7` fail
    /// with [`TunerError::InvalidChannel`].
    fn read_raw(&mut self, channel: u8) -> Result<u16>;

    fn is_enabled(&mut self) -> Result<bool>;

    /// Closes the device and gives back any pins. Safe to call repeatedly.
    fn release(&mut self) {}
}

/// Validates an ADC channel number.
pub fn check_channel(channel: u8) -> Result<u8> {
    if channel < ADC_CHANNELS {
        Ok(channel)
    } else {
        Err(TunerError::InvalidChannel(channel))
    }
}
