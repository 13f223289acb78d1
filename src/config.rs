use log::debug;

use crate::controller::SpindleController;
use crate::error::Result;
use crate::frame::ChecksumPolicy;
use crate::link::{HalfDuplex, Timing};
use crate::status::StatusCheck;
use crate::transport::{AutoDirection, DirectionLine, SerialTransport, StdDelay};

/// Controller over a real serial port.
pub type SerialSpindle =
    SpindleController<SerialTransport, Box<dyn DirectionLine + Send>, StdDelay>;

/// What drives the transceiver's transmit-enable pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionControl {
    /// RTS of the serial port
    #[default]
    Rts,
    /// the adapter switches on its own
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
    pub port: String,
    pub direction: DirectionControl,
    pub timing: Timing,
    pub policy: ChecksumPolicy,
    pub check: StatusCheck,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            port: "/dev/ttyUSB0".to_string(),
            direction: DirectionControl::default(),
            timing: Timing::default(),
            policy: ChecksumPolicy::default(),
            check: StatusCheck::default(),
        }
    }
}

impl DriveConfig {
    pub fn open(&self) -> Result<SerialSpindle> {
        debug!(
            "opening {} at {} baud ({:?} direction)",
            self.port, self.timing.baud, self.direction
        );
        let transport = SerialTransport::open(&self.port, self.timing.baud)?;
        let line: Box<dyn DirectionLine + Send> = match self.direction {
            DirectionControl::Rts => Box::new(transport.rts_line()?),
            DirectionControl::Auto => Box::new(AutoDirection),
        };
        let link = HalfDuplex::new(transport, line, StdDelay, self.timing.clone());
        Ok(SpindleController::new(link, self.policy, self.check))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;

    #[test]
    fn defaults_match_drive_requirements() {
        let config = DriveConfig::default();
        assert_eq!(config.timing.baud, 9600);
        assert_eq!(config.timing.settle_ms, 1);
        assert_eq!(config.timing.guard_ms, 50);
        assert_eq!(config.timing.read_timeout, Duration::from_secs(1));
        assert_eq!(config.policy, ChecksumPolicy::Fresh);
        assert_eq!(config.check, StatusCheck::Strict);
        assert_eq!(config.direction, DirectionControl::Rts);
    }

    #[test]
    fn missing_port_is_a_transport_error() {
        let config = DriveConfig {
            port: "/dev/a131ctl-no-such-port".to_string(),
            ..DriveConfig::default()
        };
        assert!(matches!(config.open(), Err(Error::Transport(_))));
    }
}
