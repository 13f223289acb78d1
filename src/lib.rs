//! Driver for A131 spindle inverters on an RS485 bus.
//! Builds the drive's 9-byte command frames, handles the half-duplex
//! direction handoff and decodes the 13-byte status broadcast.

pub mod checksum;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod link;
pub mod status;
pub mod transport;

pub use config::{DirectionControl, DriveConfig, SerialSpindle};
pub use controller::SpindleController;
pub use error::{Error, Result};
