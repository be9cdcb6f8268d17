/* Observer registry: ordered subscriber lists per event kind, invoked
 * synchronously in registration order. */
use crate::error::TrackballError;
use crate::input::InputSample;

pub type StateUpdateListener = Box<dyn Fn(&InputSample) + Send>;
pub type ErrorListener = Box<dyn Fn(&TrackballError) + Send>;

/* Listener lists for the two caller-facing events. */
#[derive(Default)]
pub struct EventRegistry {
    state_update: Vec<StateUpdateListener>,
    error: Vec<ErrorListener>,
}

impl EventRegistry {
    /* Register a listener for state-update events. */
    pub fn on_state_update(&mut self, listener: StateUpdateListener) {
        self.state_update.push(listener);
    }

    /* Register a listener for poll-cycle errors. */
    pub fn on_error(&mut self, listener: ErrorListener) {
        self.error.push(listener);
    }

    pub fn emit_state_update(&self, sample: &InputSample) {
        for listener in &self.state_update {
            listener(sample);
        }
    }

    pub fn emit_error(&self, error: &TrackballError) {
        for listener in &self.error {
            listener(error);
        }
    }

    /* Poll failures are only emitted when someone listens; otherwise */
    /* they fall through to the log.                                  */
    pub fn has_error_listeners(&self) -> bool {
        !self.error.is_empty()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("state_update", &self.state_update.len())
            .field("error", &self.error.len())
            .finish()
    }
}
