//! Core library for the potentiometer radio tuner.
//!
//! A knob on an MCP3008 channel is sampled, smoothed and matched against a
//! table of bands. Moving into or out of a band lights an indicator and
//! tunes an external player. The pure pieces ([`band`], [`smoothing`],
//! [`transition`]) carry the behavior; [`hardware`] and [`player`] are thin
//! wrappers over Linux devices and command line tools.

pub mod action;
pub mod band;
pub mod config;
pub mod error;
pub mod hardware;
pub mod player;
pub mod smoothing;
pub mod transition;
pub mod tuner;

pub use action::{ActionSink, AnnouncementChannel, ContentController, IndicatorSink, TunerActions};
pub use band::{Band, BandIndex, BandTable, MAX_ADC};
pub use config::{AppConfig, BandConfig};
pub use error::{Result, TunerError};
pub use hardware::{AnalogSource, Reading};
pub use player::{MpcController, SpeechAnnouncer};
pub use smoothing::{smooth, Smoother};
pub use transition::{Transition, TransitionEngine};
pub use tuner::Tuner;
