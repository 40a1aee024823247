use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, TunerError};

/// Largest value a 10-bit converter can report.
pub const MAX_ADC: u16 = 1023;

/// Position of a band inside its [`BandTable`].
pub type BandIndex = usize;

/// A contiguous inclusive range of readings bound to a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub lower: u16,
    pub upper: u16,
    /// Stream to start when the band is entered. Bands without one only
    /// drive the indicator.
    pub uri: Option<String>,
    /// Display name, also used for announcements.
    pub name: String,
}

impl Band {
    pub fn new(lower: u16, upper: u16, name: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            uri: None,
            name: name.into(),
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn contains(&self, value: u16) -> bool {
        (self.lower..=self.upper).contains(&value)
    }

    fn overlaps(&self, other: &Band) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}-{})", self.name, self.lower, self.upper)
    }
}

/// Ordered, immutable list of bands built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandTable {
    bands: Vec<Band>,
}

impl BandTable {
    /// Builds a table, rejecting inverted ranges. Bounds above [`MAX_ADC`]
    /// are logged and kept; no reading can reach them. Overlaps are
    /// accepted; see [`BandTable::find`].
    pub fn new(bands: Vec<Band>) -> Result<Self> {
        for (index, band) in bands.iter().enumerate() {
            if band.lower > band.upper {
                return Err(TunerError::config(format!(
                    "band {} `{}` has lower bound {} above upper bound {}",
                    index + 1,
                    band.name,
                    band.lower,
                    band.upper
                )));
            }
            if band.upper > MAX_ADC {
                tracing::warn!(
                    band = %band,
                    max = MAX_ADC,
                    "band extends past the converter range"
                );
            }
        }

        Ok(Self { bands })
    }

    /// Returns the index of the band containing `value`.
    ///
    /// Bands are scanned in declaration order and the first hit wins, so a
    /// misconfigured table with overlapping ranges resolves deterministically
    /// to the band declared first.
    pub fn find(&self, value: u16) -> Option<BandIndex> {
        self.bands.iter().position(|band| band.contains(value))
    }

    pub fn get(&self, index: BandIndex) -> Option<&Band> {
        self.bands.get(index)
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Every pair of bands whose ranges intersect, as `(earlier, later)`.
    pub fn overlaps(&self) -> Vec<(BandIndex, BandIndex)> {
        let mut pairs = Vec::new();
        for (i, a) in self.bands.iter().enumerate() {
            for (j, b) in self.bands.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }
}
