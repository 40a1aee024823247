use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::{
    hardware::{check_channel, AnalogSource, Reading},
    ActionSink, BandTable, Result, Smoother, Transition, TransitionEngine, TunerError,
};

/// Owns the analog source, the state machine and the action sink, and runs
/// the read → smooth → match → dispatch cycle.
///
/// Cleanup (indicator off, ADC closed, pins released) happens exactly once:
/// at the end of [`Tuner::run`], on an explicit [`Tuner::shutdown`], or on
/// drop, whichever comes first.
pub struct Tuner<S: AnalogSource> {
    source: S,
    channel: u8,
    smoother: Smoother,
    engine: TransitionEngine,
    sink: Box<dyn ActionSink>,
    poll_interval: Duration,
    last_value: u16,
    shut_down: bool,
}

impl<S: AnalogSource> Tuner<S> {
    pub fn new(
        source: S,
        channel: u8,
        smoother: Smoother,
        table: BandTable,
        sink: Box<dyn ActionSink>,
    ) -> Result<Self> {
        let channel = check_channel(channel)?;
        Ok(Self {
            source,
            channel,
            smoother,
            engine: TransitionEngine::new(table),
            sink,
            poll_interval: Duration::from_millis(16),
            last_value: 0,
            shut_down: false,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// Takes a smoothed reading. A switched-off source skips sampling and
    /// reports the last value seen.
    pub fn read(&mut self) -> Result<Reading> {
        if !self.source.is_enabled()? {
            return Ok(Reading {
                value: self.last_value,
                enabled: false,
            });
        }

        let channel = self.channel;
        let source = &mut self.source;
        let value = self.smoother.smooth(|| source.read_raw(channel))?;
        self.last_value = value;

        Ok(Reading {
            value,
            enabled: true,
        })
    }

    /// Runs a single tick.
    pub fn tick(&mut self) -> Result<Transition> {
        if self.shut_down {
            return Err(TunerError::msg("tuner has been shut down"));
        }

        let reading = self.read()?;
        tracing::trace!(value = reading.value, enabled = reading.enabled, "tick");
        Ok(self
            .engine
            .observe(reading.value, reading.enabled, self.sink.as_mut()))
    }

    /// Polls until `stop` is raised, then shuts down.
    ///
    /// Transient read failures are logged and the loop keeps going; a
    /// channel or configuration error ends it. Cleanup runs on both paths.
    /// A tuner that has already been shut down cannot run again.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        if self.shut_down {
            return Err(TunerError::msg("tuner has been shut down"));
        }

        let result = self.poll(stop);
        self.shutdown();
        result
    }

    fn poll(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::Relaxed) {
            match self.tick() {
                Ok(_) => {}
                Err(err @ (TunerError::InvalidChannel(_) | TunerError::Config(_))) => {
                    return Err(err)
                }
                Err(err) => tracing::warn!(%err, "could not read tuner position"),
            }

            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }

        tracing::info!("stop requested");
        Ok(())
    }

    /// Clears the indicator and releases every device handle. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.sink.shutdown();
        self.source.release();
        tracing::info!("cleanup completed");
    }
}

impl<S: AnalogSource> Drop for Tuner<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: AnalogSource> std::fmt::Debug for Tuner<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tuner")
            .field("channel", &self.channel)
            .field("smoother", &self.smoother)
            .field("current", &self.engine.current())
            .field("poll_interval", &self.poll_interval)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        rc::Rc,
        sync::Arc,
    };

    use super::*;
    use crate::Band;

    /// Plays back `(raw, enabled)` pairs, one per tick, and raises `stop`
    /// once the script runs out. `fail_on` makes the reads of one tick
    /// (1-based) fail with the given error.
    struct ScriptedSource {
        script: VecDeque<(u16, bool)>,
        current: (u16, bool),
        ticks: usize,
        fail_on: Option<(usize, TunerError)>,
        reads: Rc<Cell<usize>>,
        releases: Rc<Cell<usize>>,
        stop: Arc<AtomicBool>,
    }

    impl AnalogSource for ScriptedSource {
        fn read_raw(&mut self, channel: u8) -> Result<u16> {
            check_channel(channel)?;
            if matches!(self.fail_on, Some((tick, _)) if tick == self.ticks) {
                if let Some((_, err)) = self.fail_on.take() {
                    return Err(err);
                }
            }
            self.reads.set(self.reads.get() + 1);
            Ok(self.current.0)
        }

        fn is_enabled(&mut self) -> Result<bool> {
            self.ticks += 1;
            match self.script.pop_front() {
                Some(step) => self.current = step,
                None => self.stop.store(true, Ordering::Relaxed),
            }
            Ok(self.current.1)
        }

        fn release(&mut self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ActionSink for Recorder {
        fn on_enter(&mut self, band: &Band, value: u16) {
            self.log.borrow_mut().push(format!("enter {}@{value}", band.name));
        }

        fn on_leave(&mut self, band: &Band, value: u16) {
            self.log.borrow_mut().push(format!("leave {}@{value}", band.name));
        }

        fn shutdown(&mut self) {
            self.log.borrow_mut().push("shutdown".to_string());
        }
    }

    struct Fixture {
        tuner: Tuner<ScriptedSource>,
        log: Rc<RefCell<Vec<String>>>,
        reads: Rc<Cell<usize>>,
        releases: Rc<Cell<usize>>,
        stop: Arc<AtomicBool>,
    }

    fn fixture(script: &[(u16, bool)], samples: u32) -> Fixture {
        failing_fixture(script, samples, None)
    }

    fn failing_fixture(
        script: &[(u16, bool)],
        samples: u32,
        fail_on: Option<(usize, TunerError)>,
    ) -> Fixture {
        let reads = Rc::new(Cell::new(0));
        let releases = Rc::new(Cell::new(0));
        let stop = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource {
            script: script.iter().copied().collect(),
            current: (0, true),
            ticks: 0,
            fail_on,
            reads: reads.clone(),
            releases: releases.clone(),
            stop: stop.clone(),
        };
        let recorder = Recorder::default();
        let log = recorder.log.clone();
        let table =
            BandTable::new(vec![Band::new(100, 200, "A"), Band::new(300, 400, "B")]).unwrap();
        let smoother = Smoother::new(samples, Duration::ZERO).unwrap();
        let tuner = Tuner::new(source, 0, smoother, table, Box::new(recorder))
            .unwrap()
            .with_poll_interval(Duration::ZERO);

        Fixture {
            tuner,
            log,
            reads,
            releases,
            stop,
        }
    }

    #[test]
    fn run_dispatches_transitions_and_cleans_up_once() {
        let script: Vec<(u16, bool)> = [50, 150, 150, 350, 500].iter().map(|v| (*v, true)).collect();
        let mut f = fixture(&script, 2);

        f.tuner.run(&f.stop).unwrap();
        drop(f.tuner);

        assert_eq!(
            *f.log.borrow(),
            vec!["enter A@150", "leave A@350", "enter B@350", "leave B@500", "shutdown"]
        );
        assert_eq!(f.releases.get(), 1);
    }

    #[test]
    fn switch_off_skips_sampling_and_leaves_band() {
        let mut f = fixture(&[(150, true), (150, false), (350, false)], 4);

        f.tuner.tick().unwrap();
        assert_eq!(f.reads.get(), 4);

        let transition = f.tuner.tick().unwrap();
        assert_eq!(transition, Transition::Changed { from: Some(0), to: None });
        f.tuner.tick().unwrap();

        assert_eq!(f.reads.get(), 4);
        assert_eq!(*f.log.borrow(), vec!["enter A@150", "leave A@150"]);
    }

    #[test]
    fn stop_before_first_tick_still_cleans_up() {
        let mut f = fixture(&[(150, true)], 1);
        f.stop.store(true, Ordering::Relaxed);

        f.tuner.run(&f.stop).unwrap();
        assert_eq!(f.reads.get(), 0);
        assert_eq!(*f.log.borrow(), vec!["shutdown"]);
        assert_eq!(f.releases.get(), 1);
    }

    #[test]
    fn drop_without_run_cleans_up() {
        let f = fixture(&[], 1);
        drop(f.tuner);
        assert_eq!(f.releases.get(), 1);
        assert_eq!(*f.log.borrow(), vec!["shutdown"]);
    }

    #[test]
    fn tick_after_shutdown_is_rejected() {
        let mut f = fixture(&[(150, true)], 1);
        f.tuner.shutdown();
        assert!(f.tuner.tick().is_err());
        assert_eq!(f.releases.get(), 1);
    }

    #[test]
    fn rejects_invalid_channel_up_front() {
        let f = fixture(&[], 1);
        let source = ScriptedSource {
            script: VecDeque::new(),
            current: (0, true),
            ticks: 0,
            fail_on: None,
            reads: f.reads.clone(),
            releases: f.releases.clone(),
            stop: f.stop.clone(),
        };
        let table = BandTable::new(Vec::new()).unwrap();
        let smoother = Smoother::new(1, Duration::ZERO).unwrap();

        let err = Tuner::new(source, 9, smoother, table, Box::new(Recorder::default())).unwrap_err();
        assert!(matches!(err, TunerError::InvalidChannel(9)));
    }

    #[test]
    fn transient_read_error_keeps_polling() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "bus glitch");
        let mut f = failing_fixture(
            &[(150, true), (150, true), (350, true)],
            1,
            Some((2, TunerError::Io(io))),
        );

        f.tuner.run(&f.stop).unwrap();

        assert_eq!(
            *f.log.borrow(),
            vec!["enter A@150", "leave A@350", "enter B@350", "shutdown"]
        );
        assert_eq!(f.tuner.engine().current(), Some(1));
        assert_eq!(f.releases.get(), 1);
    }

    #[test]
    fn invalid_channel_mid_loop_ends_run() {
        let mut f = failing_fixture(
            &[(150, true), (350, true), (500, true)],
            1,
            Some((2, TunerError::InvalidChannel(9))),
        );

        let err = f.tuner.run(&f.stop).unwrap_err();

        assert!(matches!(err, TunerError::InvalidChannel(9)));
        assert_eq!(*f.log.borrow(), vec!["enter A@150", "shutdown"]);
        assert_eq!(f.tuner.engine().current(), Some(0));
        assert!(!f.stop.load(Ordering::Relaxed));
        assert_eq!(f.releases.get(), 1);
    }

    #[test]
    fn run_after_shutdown_returns_immediately() {
        let mut f = fixture(&[(150, true)], 1);
        f.tuner.shutdown();

        assert!(f.tuner.run(&f.stop).is_err());
        assert_eq!(f.reads.get(), 0);
        assert!(!f.stop.load(Ordering::Relaxed));
        assert_eq!(*f.log.borrow(), vec!["shutdown"]);
        assert_eq!(f.releases.get(), 1);
    }
}
