//! Actuator-facing callback registrations.

use std::fmt;
use std::sync::Arc;

/// Invoked with a target position in percent100ths (0 = open, 10000 = closed).
pub type PositionCallback = Arc<dyn Fn(u16) + Send + Sync>;

/// Invoked with an identify duration in seconds (0 = stop).
pub type IdentifyCallback = Arc<dyn Fn(u16) + Send + Sync>;

/// Driver side of the bridge: what a physical (or simulated) actuator does
/// when a controller asks for something.
pub trait ActuatorSink: Send + Sync {
    /// Move toward `percent100ths`. Must not block.
    fn on_target_position(&self, percent100ths: u16);

    /// Start (`duration_s > 0`) or stop (`0`) identifying.
    fn on_identify(&self, duration_s: u16);
}

/// Callback set handed to the bridge once at init.
///
/// Either callback may be absent; events for a missing callback are dropped.
#[derive(Clone, Default)]
pub struct Callbacks {
    position: Option<PositionCallback>,
    identify: Option<IdentifyCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route both events to an [`ActuatorSink`].
    pub fn from_sink<S: ActuatorSink + 'static>(sink: Arc<S>) -> Self {
        let position_sink = sink.clone();
        Self {
            position: Some(Arc::new(move |p| position_sink.on_target_position(p))),
            identify: Some(Arc::new(move |d| sink.on_identify(d))),
        }
    }

    pub fn on_position(mut self, callback: impl Fn(u16) + Send + Sync + 'static) -> Self {
        self.position = Some(Arc::new(callback));
        self
    }

    pub fn on_identify(mut self, callback: impl Fn(u16) + Send + Sync + 'static) -> Self {
        self.identify = Some(Arc::new(callback));
        self
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn has_identify(&self) -> bool {
        self.identify.is_some()
    }

    /// Returns false when no position callback is registered.
    pub(crate) fn notify_position(&self, percent100ths: u16) -> bool {
        match &self.position {
            Some(callback) => {
                callback(percent100ths);
                true
            }
            None => false,
        }
    }

    /// Returns false when no identify callback is registered.
    pub(crate) fn notify_identify(&self, duration_s: u16) -> bool {
        match &self.identify {
            Some(callback) => {
                callback(duration_s);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("position", &self.position.is_some())
            .field("identify", &self.identify.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        positions: Mutex<Vec<u16>>,
        identifies: Mutex<Vec<u16>>,
    }

    impl ActuatorSink for RecordingSink {
        fn on_target_position(&self, percent100ths: u16) {
            self.positions.lock().push(percent100ths);
        }

        fn on_identify(&self, duration_s: u16) {
            self.identifies.lock().push(duration_s);
        }
    }

    #[test]
    fn test_empty_callbacks_absorb_events() {
        let callbacks = Callbacks::new();
        assert!(!callbacks.notify_position(100));
        assert!(!callbacks.notify_identify(10));
    }

    #[test]
    fn test_sink_receives_both_events() {
        let sink = Arc::new(RecordingSink::default());
        let callbacks = Callbacks::from_sink(sink.clone());

        assert!(callbacks.notify_position(2500));
        assert!(callbacks.notify_identify(10));
        assert_eq!(*sink.positions.lock(), vec![2500]);
        assert_eq!(*sink.identifies.lock(), vec![10]);
    }

    #[test]
    fn test_closure_builder() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let callbacks = Callbacks::new().on_position(move |p| *seen_clone.lock() = Some(p));

        assert!(callbacks.has_position());
        assert!(!callbacks.has_identify());
        callbacks.notify_position(42);
        assert_eq!(*seen.lock(), Some(42));
    }
}
