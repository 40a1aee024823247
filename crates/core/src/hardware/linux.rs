//! Board wiring on Linux: spidev, i2c-dev and the GPIO character device.
//!
//! Pins are requested by line offset on `gpio_chip`, which on a Raspberry
//! Pi is the BCM number regardless of the kernel's global GPIO base.

use embedded_hal_bus::spi::ExclusiveDevice;
use linux_embedded_hal::{
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, Delay, I2cdev, SpidevBus,
};

use super::{Mcp3008, Pcf8574, PinMonitor};
use crate::{AppConfig, Result, TunerError};

/// Label shown by `gpioinfo` for lines held by this process.
const CONSUMER: &str = "tuner";

pub type LinuxSpi = ExclusiveDevice<SpidevBus, CdevPin, Delay>;
pub type LinuxAdc = Mcp3008<LinuxSpi, CdevPin>;
pub type LinuxExpander = Pcf8574<I2cdev>;

fn open_chip(path: &str) -> Result<Chip> {
    Chip::new(path).map_err(|err| TunerError::bus("open GPIO chip", format!("{path}: {err}")))
}

fn request_line(
    chip: &mut Chip,
    offset: u32,
    flags: LineRequestFlags,
    default: u8,
) -> Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(flags, default, CONSUMER))
        .map_err(|err| TunerError::bus("request GPIO line", format!("{offset}: {err}")))?;
    CdevPin::new(handle)
        .map_err(|err| TunerError::bus("request GPIO line", format!("{offset}: {err}")))
}

/// Opens the converter with its manually driven chip select and, when
/// configured, the on/off switch.
pub fn open_adc(config: &AppConfig) -> Result<LinuxAdc> {
    let adc = &config.adc;
    let mut chip = open_chip(&config.gpio_chip)?;

    // Claim chip select (idle high) before the bus so the converter never
    // sees a floating line.
    let chip_select = request_line(&mut chip, adc.chip_select_pin, LineRequestFlags::OUTPUT, 1)?;

    let path = format!("/dev/spidev{}.{}", adc.spi_bus, adc.spi_device);
    let mut bus = SpidevBus::open(&path)
        .map_err(|err| TunerError::bus("open SPI device", format!("{path}: {err}")))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(adc.speed_hz)
        .mode(SpiModeFlags::SPI_MODE_0 | SpiModeFlags::SPI_NO_CS)
        .build();
    bus.0
        .configure(&options)
        .map_err(|err| TunerError::bus("configure SPI device", format!("{path}: {err}")))?;

    let spi = ExclusiveDevice::new(bus, chip_select, Delay)
        .map_err(|err| TunerError::bus("deselect ADC", format!("{err:?}")))?;
    tracing::debug!(path = %path, speed_hz = adc.speed_hz, "opened SPI device");

    let mut source = Mcp3008::new(spi);
    if let Some(pin) = config.switch.pin {
        let switch = request_line(&mut chip, pin, LineRequestFlags::INPUT, 0)?;
        source = source.with_switch(switch, config.switch.active_high);
    }
    Ok(source)
}

/// Opens `/dev/i2c-<bus>` for the indicator expander.
pub fn open_expander(config: &AppConfig) -> Result<LinuxExpander> {
    let indicator = &config.indicator;
    let path = format!("/dev/i2c-{}", indicator.i2c_bus);
    let i2c = I2cdev::new(&path)
        .map_err(|err| TunerError::bus("open I2C bus", format!("{path}: {err}")))?;

    tracing::debug!(path = %path, address = indicator.address, "opened I2C expander");
    Ok(Pcf8574::new(i2c, indicator.address))
}

/// Requests `pins` as inputs on the configured chip.
pub fn open_pin_monitor(config: &AppConfig, pins: &[u32]) -> Result<PinMonitor<CdevPin>> {
    let mut chip = open_chip(&config.gpio_chip)?;
    let lines = pins
        .iter()
        .map(|&pin| Ok((pin, request_line(&mut chip, pin, LineRequestFlags::INPUT, 0)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(PinMonitor::new(lines))
}
