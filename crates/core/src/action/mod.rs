//! Side effects driven by band transitions.
//!
//! [`ActionSink`] is the seam the transition engine talks to. The stock
//! implementation, [`TunerActions`], composes three narrower collaborators:
//! an indicator LED, a content (playlist) controller and an optional
//! announcement channel. None of their failures reach the engine.

use crate::{Band, Result};

/// Receives enter/leave notifications from the transition engine.
pub trait ActionSink {
    fn on_enter(&mut self, band: &Band, value: u16);

    fn on_leave(&mut self, band: &Band, value: u16);

    /// Puts every owned output into its idle state and releases it. Called
    /// once when the poll loop exits.
    fn shutdown(&mut self) {}
}

/// Binary indicator, exposed as a logical on/off regardless of wiring.
///
/// Implementations must be idempotent and must swallow hardware errors
/// after logging them.
pub trait IndicatorSink {
    fn set_active(&mut self, active: bool);

    /// Returns the device to its power-on state and drops any OS handle.
    fn release(&mut self) {
        self.set_active(false);
    }
}

/// Playlist-style control surface of an external media player.
pub trait ContentController {
    fn add_and_play(&mut self, uri: &str) -> Result<()>;

    fn clear(&mut self) -> Result<()>;
}

/// Fire-and-forget text announcement. Must return without waiting for the
/// announcement to finish.
pub trait AnnouncementChannel {
    fn speak_async(&self, text: &str);
}

/// Default [`ActionSink`]: lights the indicator and tunes the player.
pub struct TunerActions {
    indicator: Box<dyn IndicatorSink>,
    content: Box<dyn ContentController>,
    announcer: Option<Box<dyn AnnouncementChannel>>,
}

impl TunerActions {
    pub fn new(indicator: Box<dyn IndicatorSink>, content: Box<dyn ContentController>) -> Self {
        Self {
            indicator,
            content,
            announcer: None,
        }
    }

    pub fn with_announcer(mut self, announcer: Box<dyn AnnouncementChannel>) -> Self {
        self.announcer = Some(announcer);
        self
    }

    fn start_content(&mut self, band: &Band) -> bool {
        let Some(uri) = band.uri.as_deref() else {
            return true;
        };

        match self.content.add_and_play(uri) {
            Ok(()) => {
                tracing::debug!(band = %band.name, uri, "stream started");
                true
            }
            Err(err) => {
                tracing::warn!(band = %band.name, uri, %err, "could not start stream");
                false
            }
        }
    }
}

impl ActionSink for TunerActions {
    fn on_enter(&mut self, band: &Band, _value: u16) {
        self.indicator.set_active(true);

        if self.start_content(band) {
            if let Some(announcer) = &self.announcer {
                announcer.speak_async(&band.name);
            }
        }
    }

    fn on_leave(&mut self, band: &Band, _value: u16) {
        if band.uri.is_some() {
            if let Err(err) = self.content.clear() {
                tracing::warn!(band = %band.name, %err, "could not clear playlist");
            }
        }
        self.indicator.set_active(false);
    }

    fn shutdown(&mut self) {
        self.indicator.release();
    }
}

impl std::fmt::Debug for TunerActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunerActions")
            .field("announcer", &self.announcer.is_some())
            .finish()
    }
}
