/* Driver error definitions: TrackballError aggregates identity/colour/poll/bus
 * failures for callers that need a single error type. */
use thiserror::Error;

use crate::bus::BusError;

/* Errors that may occur while driving the trackball. */
#[derive(Debug, Error)]
pub enum TrackballError {
    /* The identity registers did not contain the expected chip id.      */
    /* Carries the value actually read, interpreted in the configured    */
    /* byte order, so the caller can spot a miswired or foreign device.  */
    #[error("Trackball chip not found. Invalid chip id: 0x{chip_id:04x}")]
    DeviceNotFound { chip_id: u16 },

    #[error("`{0}` is not a valid hexadecimal colour")]
    InvalidColorFormat(String),

    /* A transport failure observed during one poll cycle. Never        */
    /* propagated out of the polling loop; surfaced through the error   */
    /* event or a log line, and the loop keeps its schedule.            */
    #[error("Poll cycle failed: {0}")]
    Poll(#[source] BusError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
