use std::{thread, time::Duration};

use crate::{Result, TunerError};

/// Averages several consecutive ADC samples into one stable reading.
///
/// Single-shot reads from the converter jitter by a few counts. Averaging
/// keeps a resting knob from flickering across a band edge, at the cost of
/// `samples * settle` latency per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smoother {
    samples: u32,
    settle: Duration,
}

impl Smoother {
    /// Creates a smoother. A zero sample count is a configuration error.
    pub fn new(samples: u32, settle: Duration) -> Result<Self> {
        if samples == 0 {
            return Err(TunerError::config(
                "smoothing sample count must be at least 1",
            ));
        }

        Ok(Self { samples, settle })
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Calls `read_one` exactly `samples` times and returns the floor of the
    /// mean. The settling delay is inserted between reads, not after the last.
    pub fn smooth<F>(&self, mut read_one: F) -> Result<u16>
    where
        F: FnMut() -> Result<u16>,
    {
        let mut sum: u64 = 0;
        for n in 0..self.samples {
            if n > 0 && !self.settle.is_zero() {
                thread::sleep(self.settle);
            }
            sum += u64::from(read_one()?);
        }

        // The mean of u16 values always fits back into a u16.
        Ok((sum / u64::from(self.samples)) as u16)
    }
}

/// One-shot form of [`Smoother::smooth`] that validates `samples` before any
/// read happens.
pub fn smooth<F>(read_one: F, samples: u32, settle: Duration) -> Result<u16>
where
    F: FnMut() -> Result<u16>,
{
    Smoother::new(samples, settle)?.smooth(read_one)
}
