use crate::{ActionSink, BandIndex, BandTable};

/// Outcome of a single [`TransitionEngine::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The detected band did not change. Nothing was dispatched.
    Unchanged,
    /// The active band changed from `from` to `to`.
    Changed {
        from: Option<BandIndex>,
        to: Option<BandIndex>,
    },
}

impl Transition {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Tracks the active band and turns changes into leave/enter callbacks.
#[derive(Debug)]
pub struct TransitionEngine {
    table: BandTable,
    current: Option<BandIndex>,
}

impl TransitionEngine {
    pub fn new(table: BandTable) -> Self {
        Self {
            table,
            current: None,
        }
    }

    pub fn current(&self) -> Option<BandIndex> {
        self.current
    }

    /// Matches `value` against the table and advances the state machine.
    /// A disabled source always counts as "no band".
    pub fn observe(&mut self, value: u16, enabled: bool, sink: &mut dyn ActionSink) -> Transition {
        let new_band = if enabled { self.table.find(value) } else { None };
        self.tick(new_band, value, sink)
    }

    /// Advances the state machine to `new_band`.
    ///
    /// The leave callback for the old band always runs before the enter
    /// callback for the new one. `current` is updated even if the sink's
    /// actions failed: it tracks the knob, not the outputs. An index past
    /// the end of the table counts as "no band".
    pub fn tick(&mut self, new_band: Option<BandIndex>, value: u16, sink: &mut dyn ActionSink) -> Transition {
        let new_band = new_band.filter(|index| *index < self.table.len());
        if new_band == self.current {
            return Transition::Unchanged;
        }

        let from = self.current;

        if let Some(band) = from.and_then(|index| self.table.get(index)) {
            tracing::info!(band = %band, value, "left band");
            sink.on_leave(band, value);
        }

        match new_band.and_then(|index| self.table.get(index)) {
            Some(band) => {
                tracing::info!(band = %band, value, "entered band");
                sink.on_enter(band, value);
            }
            None => tracing::info!(value, "outside all bands"),
        }

        self.current = new_band;
        Transition::Changed { from, to: new_band }
    }
}
