use std::sync::{Mutex, PoisonError};

use seqrun_application::{RunEvent, RunEventSink};

/// Keeps orchestration events in memory, in emission order.
#[derive(Debug, Default)]
pub struct InMemoryRunEventSink {
    events: Mutex<Vec<RunEvent>>,
}

impl InMemoryRunEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns recorded event kinds.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(RunEvent::kind).collect()
    }
}

impl RunEventSink for InMemoryRunEventSink {
    fn record(&self, event: RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
