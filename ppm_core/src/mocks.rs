//! Test and helper sinks for ppm_core

use std::cell::RefCell;
use std::rc::Rc;

use crate::status::{StatusEvent, StatusSink};

/// Records every event; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<StatusEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.borrow().clone()
    }

    /// Events other than `Measurement`.
    pub fn display_events(&self) -> Vec<StatusEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| !matches!(e, StatusEvent::Measurement { .. }))
            .copied()
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl StatusSink for RecordingSink {
    fn show(&mut self, event: &StatusEvent) {
        self.events.borrow_mut().push(*event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn show(&mut self, _event: &StatusEvent) {}
}
