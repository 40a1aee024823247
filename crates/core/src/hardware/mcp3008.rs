use embedded_hal::{
    digital::InputPin,
    spi::{Error as _, SpiDevice},
};

use super::{check_channel, AnalogSource};
use crate::{Result, TunerError};

/// Start bit followed by single-ended mode and the channel number.
pub fn request_frame(channel: u8) -> [u8; 3] {
    [0x01, (0x08 | channel) << 4, 0x00]
}

/// Extracts the 10-bit result from the second and third response bytes.
pub fn decode_frame(rx: [u8; 3]) -> u16 {
    (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2])
}

/// MCP3008 on an SPI device, plus an optional on/off switch input.
///
/// Chip select belongs to the `SpiDevice`: every conversion is a single
/// three-byte transaction.
#[derive(Debug)]
pub struct Mcp3008<SPI, SW> {
    spi: Option<SPI>,
    switch: Option<(SW, bool)>,
}

impl<SPI, SW> Mcp3008<SPI, SW>
where
    SPI: SpiDevice,
    SW: InputPin,
{
    /// Creates a converter without a switch; it always reports enabled.
    pub fn new(spi: SPI) -> Self {
        Self {
            spi: Some(spi),
            switch: None,
        }
    }

    /// Attaches the on/off switch. `active_high` says which level means on.
    pub fn with_switch(mut self, pin: SW, active_high: bool) -> Self {
        self.switch = Some((pin, active_high));
        self
    }

    pub fn is_released(&self) -> bool {
        self.spi.is_none()
    }
}

impl<SPI, SW> AnalogSource for Mcp3008<SPI, SW>
where
    SPI: SpiDevice,
    SW: InputPin,
{
    fn read_raw(&mut self, channel: u8) -> Result<u16> {
        let channel = check_channel(channel)?;
        let spi = self
            .spi
            .as_mut()
            .ok_or_else(|| TunerError::msg("ADC has already been released"))?;

        let mut frame = request_frame(channel);
        spi.transfer_in_place(&mut frame)
            .map_err(|err| TunerError::bus("SPI transfer", format!("{:?}", err.kind())))?;
        Ok(decode_frame(frame))
    }

    fn is_enabled(&mut self) -> Result<bool> {
        match &mut self.switch {
            Some((pin, active_high)) => {
                let high = pin
                    .is_high()
                    .map_err(|err| TunerError::bus("switch read", format!("{err:?}")))?;
                Ok(high == *active_high)
            }
            None => Ok(true),
        }
    }

    fn release(&mut self) {
        self.switch = None;
        if self.spi.take().is_some() {
            tracing::debug!("closed SPI device");
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::{
        digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction},
        spi::{Mock as SpiMock, Transaction as SpiTransaction},
    };

    use super::*;

    fn conversion(channel: u8, response: [u8; 3]) -> Vec<SpiTransaction<u8>> {
        vec![
            SpiTransaction::transaction_start(),
            SpiTransaction::transfer_in_place(request_frame(channel).to_vec(), response.to_vec()),
            SpiTransaction::transaction_end(),
        ]
    }

    #[test]
    fn builds_single_ended_request() {
        assert_eq!(request_frame(0), [0x01, 0x80, 0x00]);
        assert_eq!(request_frame(7), [0x01, 0xF0, 0x00]);
    }

    #[test]
    fn decodes_ten_bit_value() {
        assert_eq!(decode_frame([0xFF, 0x03, 0xFF]), 1023);
        assert_eq!(decode_frame([0x00, 0x02, 0x00]), 512);
        // Bits above the result are ignored.
        assert_eq!(decode_frame([0x00, 0xFC, 0x19]), 25);
    }

    #[test]
    fn reads_channel_in_one_transaction() {
        let mut expectations = conversion(0, [0x00, 0x01, 0x40]);
        expectations.extend(conversion(5, [0x00, 0x03, 0xFF]));
        let mut spi = SpiMock::new(&expectations);

        let mut adc: Mcp3008<_, PinMock> = Mcp3008::new(spi.clone());
        assert_eq!(adc.read_raw(0).unwrap(), 320);
        assert_eq!(adc.read_raw(5).unwrap(), 1023);
        assert!(adc.is_enabled().unwrap());

        spi.done();
    }

    #[test]
    fn invalid_channel_never_touches_the_bus() {
        let mut spi: SpiMock<u8> = SpiMock::new(&[]);
        let mut adc: Mcp3008<_, PinMock> = Mcp3008::new(spi.clone());

        assert!(matches!(adc.read_raw(8), Err(TunerError::InvalidChannel(8))));
        spi.done();
    }

    #[test]
    fn switch_level_is_mapped_through_polarity() {
        let mut spi: SpiMock<u8> = SpiMock::new(&[]);
        let mut high_on = PinMock::new(&[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ]);
        let mut low_on = PinMock::new(&[PinTransaction::get(PinState::High)]);

        let mut adc = Mcp3008::new(spi.clone()).with_switch(high_on.clone(), true);
        assert!(adc.is_enabled().unwrap());
        assert!(!adc.is_enabled().unwrap());

        let mut inverted = Mcp3008::new(spi.clone()).with_switch(low_on.clone(), false);
        assert!(!inverted.is_enabled().unwrap());

        spi.done();
        high_on.done();
        low_on.done();
    }

    #[test]
    fn release_is_idempotent_and_blocks_reads() {
        let mut spi: SpiMock<u8> = SpiMock::new(&[]);
        let mut adc: Mcp3008<_, PinMock> = Mcp3008::new(spi.clone());
        spi.done();

        adc.release();
        adc.release();
        assert!(adc.is_released());
        assert!(adc.read_raw(0).is_err());
    }
}
