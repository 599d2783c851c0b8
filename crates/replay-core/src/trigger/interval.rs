// # Interval Trigger
//
// Requests a pass at a fixed period, starting immediately.
//
// A period of zero disables the timer: the stream ends right away and the
// engine relies on its other sources.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};

use crate::traits::trigger_source::{SyncRequest, TriggerSource};

/// Periodic trigger source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTrigger {
    period: Duration,
}

impl IntervalTrigger {
    /// Create a trigger firing every `period`
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Create a trigger firing every `secs` seconds (0 = disabled)
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Whether the timer ever fires
    pub fn is_enabled(&self) -> bool {
        !self.period.is_zero()
    }
}

impl TriggerSource for IntervalTrigger {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = SyncRequest> + Send + 'static>> {
        if !self.is_enabled() {
            tracing::info!("Periodic replay updates disabled");
            return Box::pin(tokio_stream::empty());
        }

        tracing::info!("Periodic replay updates every {:?}", self.period);

        // First tick completes immediately
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Box::pin(IntervalStream::new(interval).map(|_| SyncRequest::Timer))
    }

    fn source_name(&self) -> &'static str {
        "interval"
    }
}
