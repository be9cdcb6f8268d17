/* pim447-rs: async driver for the Pimoroni PIM447 I2C trackball breakout.
 * Verifies the chip identity on enable, polls the motion/click registers on a
 * timer and emits state-update events, and drives the four-channel RGBW
 * illuminator with independent colour and contrast. */
pub mod bus;
pub mod color;
pub mod driver;
pub mod error;
pub mod events;
pub mod input;
pub mod registers;

pub use bus::{Bus, BusError, I2cBus, I2cWire, Wire};
pub use color::{RgbColor, RgbwColor, hex_to_rgb, hex_to_rgbw, rgb_to_rgbw};
pub use driver::{
    ByteOrder, DEFAULT_CHANNEL, DEFAULT_REFRESH_INTERVAL_MS, Guarded, Trackball,
};
pub use error::TrackballError;
pub use events::EventRegistry;
pub use input::InputSample;
