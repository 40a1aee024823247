use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{hardware::check_channel, Band, BandTable, Result, Smoother, TunerError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// GPIO character device the chip select and switch lines live on.
    pub gpio_chip: String,
    pub adc: AdcConfig,
    pub indicator: IndicatorConfig,
    pub switch: SwitchConfig,
    pub smoothing: SmoothingConfig,
    pub poll_interval_ms: PollInterval,
    pub player: PlayerConfig,
    pub announcer: AnnouncerConfig,
    pub bands: Vec<BandConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gpio_chip: "/dev/gpiochip0".to_string(),
            adc: AdcConfig::default(),
            indicator: IndicatorConfig::default(),
            switch: SwitchConfig::default(),
            smoothing: SmoothingConfig::default(),
            poll_interval_ms: PollInterval::default(),
            player: PlayerConfig::default(),
            announcer: AnnouncerConfig::default(),
            bands: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Defaults matching the prototype board: five bands, no streams
    /// attached.
    pub fn live_defaults() -> Self {
        let bands = [(0, 200), (305, 335), (360, 395), (430, 468), (801, 1023)]
            .into_iter()
            .map(|(lower, upper)| BandConfig {
                lower,
                upper,
                uri: None,
                name: None,
            })
            .collect();

        Self {
            bands,
            ..Self::default()
        }
    }

    /// Loads a JSON configuration file. Missing sections take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            TunerError::config(format!("could not read {}: {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.0)
    }

    /// Builds the immutable band table. Unnamed bands are called
    /// "Range N" after their 1-based position.
    pub fn band_table(&self) -> Result<BandTable> {
        let bands = self
            .bands
            .iter()
            .enumerate()
            .map(|(index, band)| Band {
                lower: band.lower,
                upper: band.upper,
                uri: band.uri.clone().filter(|uri| !uri.is_empty()),
                name: band
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Range {}", index + 1)),
            })
            .collect();

        BandTable::new(bands)
    }

    pub fn smoother(&self) -> Result<Smoother> {
        let samples = u32::try_from(self.smoothing.samples)
            .ok()
            .filter(|samples| *samples > 0)
            .ok_or_else(|| {
                TunerError::config(format!(
                    "smoothing sample count must be positive, got {}",
                    self.smoothing.samples
                ))
            })?;

        Smoother::new(samples, Duration::from_millis(self.smoothing.settle_ms))
    }

    /// Runs every startup check and returns the pieces the poll loop needs.
    /// Overlapping bands are reported but accepted.
    pub fn validate(&self) -> Result<(BandTable, Smoother)> {
        check_channel(self.adc.channel)
            .map_err(|err| TunerError::config(err.to_string()))?;
        if self.indicator.pin > 7 {
            return Err(TunerError::config(format!(
                "indicator pin {} is out of range (expected 0-7)",
                self.indicator.pin
            )));
        }

        if self.indicator.address > 0x7F {
            return Err(TunerError::config(format!(
                "indicator address {:#04x} is not a 7-bit address",
                self.indicator.address
            )));
        }

        let smoother = self.smoother()?;
        let table = self.band_table()?;

        for (first, second) in table.overlaps() {
            if let (Some(a), Some(b)) = (table.get(first), table.get(second)) {
                tracing::warn!(
                    first = %a,
                    second = %b,
                    "bands overlap; readings in both resolve to the first"
                );
            }
        }

        Ok((table, smoother))
    }
}

/// MCP3008 wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    pub spi_bus: u8,
    pub spi_device: u8,
    pub speed_hz: u32,
    /// Line offset (BCM number) driven as chip select.
    pub chip_select_pin: u32,
    pub channel: u8,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            spi_device: 1,
            speed_hz: 10_000,
            chip_select_pin: 7,
            channel: 0,
        }
    }
}

/// PCF8574 wiring for the indicator LED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub i2c_bus: u8,
    /// 7-bit bus address.
    pub address: u8,
    pub pin: u8,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x20,
            pin: 0,
        }
    }
}

/// Optional on/off switch. Without a pin the tuner is always on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub pin: Option<u32>,
    pub active_high: bool,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            pin: None,
            active_high: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Must be positive.
    pub samples: i64,
    pub settle_ms: u64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            samples: 8,
            settle_ms: 1,
        }
    }
}

/// Delay between ticks in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollInterval(pub u64);

impl Default for PollInterval {
    fn default() -> Self {
        // ~60 Hz
        Self(16)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub program: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: "mpc".to_string(),
        }
    }
}

/// Speech backend. `None` disables announcements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerConfig {
    pub program: Option<String>,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            program: Some("espeak".to_string()),
        }
    }
}

/// One `(lower, upper, uri, name)` entry of the band list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandConfig {
    pub lower: u16,
    pub upper: u16,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
