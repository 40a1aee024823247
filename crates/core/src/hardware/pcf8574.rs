use embedded_hal::i2c::{Error as _, I2c, SevenBitAddress};

use crate::{IndicatorSink, Result, TunerError};

/// Quasi-bidirectional pins power up high.
const ALL_HIGH: u8 = 0xFF;

/// 8-bit I2C port expander.
///
/// The device has no readable output register, so the handle keeps the last
/// written pin byte and every write sends the whole byte.
#[derive(Debug)]
pub struct Pcf8574<I2C> {
    i2c: Option<I2C>,
    address: SevenBitAddress,
    pin_state: u8,
}

impl<I2C: I2c> Pcf8574<I2C> {
    pub fn new(i2c: I2C, address: SevenBitAddress) -> Self {
        Self {
            i2c: Some(i2c),
            address,
            pin_state: ALL_HIGH,
        }
    }

    pub fn pin_state(&self) -> u8 {
        self.pin_state
    }

    /// Updates the cached pin byte. Nothing is sent until [`Pcf8574::write`].
    pub fn set_pin(&mut self, pin: u8, high: bool) {
        let mask = 1u8 << (pin & 0x07);
        if high {
            self.pin_state |= mask;
        } else {
            self.pin_state &= !mask;
        }
    }

    pub fn write(&mut self) -> Result<()> {
        let i2c = self
            .i2c
            .as_mut()
            .ok_or_else(|| TunerError::msg("I2C expander has already been released"))?;
        i2c.write(self.address, &[self.pin_state])
            .map_err(|err| TunerError::bus("I2C write", format!("{:?}", err.kind())))
    }

    /// Drives every pin high again.
    pub fn reset(&mut self) -> Result<()> {
        self.pin_state = ALL_HIGH;
        self.write()
    }

    /// Resets the pins and gives up the bus handle. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.i2c.is_none() {
            return Ok(());
        }
        let result = self.reset();
        self.i2c = None;
        result
    }

    pub fn is_closed(&self) -> bool {
        self.i2c.is_none()
    }
}

/// Indicator LED wired active-low to one expander pin.
#[derive(Debug)]
pub struct Pcf8574Indicator<I2C> {
    expander: Pcf8574<I2C>,
    pin: u8,
}

impl<I2C: I2c> Pcf8574Indicator<I2C> {
    pub fn new(expander: Pcf8574<I2C>, pin: u8) -> Self {
        Self { expander, pin }
    }

    pub fn expander(&self) -> &Pcf8574<I2C> {
        &self.expander
    }
}

impl<I2C: I2c> IndicatorSink for Pcf8574Indicator<I2C> {
    fn set_active(&mut self, active: bool) {
        self.expander.set_pin(self.pin, !active);
        if let Err(err) = self.expander.write() {
            tracing::warn!(pin = self.pin, active, %err, "could not update indicator");
        }
    }

    fn release(&mut self) {
        if let Err(err) = self.expander.close() {
            tracing::warn!(%err, "could not reset I2C expander");
        }
    }
}
