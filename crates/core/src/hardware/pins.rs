use embedded_hal::digital::InputPin;

use crate::{Result, TunerError};

/// BCM inputs watched by the bench-check tool.
pub const DEFAULT_WATCHED_PINS: [u32; 12] = [4, 17, 27, 22, 18, 23, 24, 25, 19, 26, 16, 12];

/// A labelled set of input pins sampled together.
#[derive(Debug)]
pub struct PinMonitor<P> {
    pins: Vec<(u32, P)>,
}

impl<P: InputPin> PinMonitor<P> {
    pub fn new(pins: Vec<(u32, P)>) -> Self {
        Self { pins }
    }

    /// Reads every pin once, in the order given. `true` means high.
    pub fn sample(&mut self) -> Result<Vec<(u32, bool)>> {
        self.pins
            .iter_mut()
            .map(|(number, pin)| {
                pin.is_high()
                    .map(|high| (*number, high))
                    .map_err(|err| TunerError::bus("pin read", format!("{err:?}")))
            })
            .collect()
    }
}
