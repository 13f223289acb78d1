use crate::checksum::{Checksum, DriveFamily};
use crate::error::{Error, Result};

/// Every frame received by the drive is 9 bytes long.
pub const COMMAND_FRAME_LEN: usize = 9;

const ADDRESS: u8 = 0x00;
const COMMAND: u8 = 0x55;
const FIXED: u8 = 0x01;
const STOP: u8 = 0xFF;

/// Trailer hard-coded in the panel protocol notes (`XOR(54) ADD(A9)`).
const LEGACY_TRAILER: [u8; 2] = [0x54, 0xA9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    Off,
}

impl Direction {
    fn control_byte(self) -> u8 {
        match self {
            Direction::Clockwise => 0x00,
            Direction::Off => 0x01,
        }
    }
}

/// How the XOR/ADD trailer of an outgoing frame is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// recomputed from the payload of every frame
    #[default]
    Fresh,
    /// the constant `54 A9` trailer older firmware clients sent, whatever the
    /// payload; kept to replay captured traffic
    Legacy,
}

/// A complete frame for the drive, trailer included.
///
/// The only way to get one is through [`build_power_frame`] or
/// [`build_speed_frame`], which stamp the trailer after the payload is final.
/// Layout:
/// [0]    address 0x00
/// [1]    command 0x55
/// [2..5) D1 D2 D3
/// [5]    0x01
/// [6]    XOR
/// [7]    ADD
/// [8]    stop 0xFF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; COMMAND_FRAME_LEN],
}

impl CommandFrame {
    fn stamp(data: [u8; 3], policy: ChecksumPolicy) -> Self {
        let mut bytes = [0u8; COMMAND_FRAME_LEN];
        bytes[0] = ADDRESS;
        bytes[1] = COMMAND;
        bytes[2..5].copy_from_slice(&data);
        bytes[5] = FIXED;

        let trailer = match policy {
            ChecksumPolicy::Fresh => DriveFamily::A131
                .checksum_strategy()
                .trailer(&bytes[1..6]),
            ChecksumPolicy::Legacy => LEGACY_TRAILER,
        };
        bytes[6..8].copy_from_slice(&trailer);
        bytes[8] = STOP;

        CommandFrame { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; COMMAND_FRAME_LEN] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// The five bytes covered by the trailer.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..6]
    }

    /// Check that the trailer matches the payload. Only frames built with
    /// [`ChecksumPolicy::Legacy`] can fail this.
    pub fn verify(&self) -> Result<()> {
        let expected = Checksum::over(self.payload()).as_u16();
        let found = u16::from_be_bytes([self.bytes[6], self.bytes[7]]);
        if expected != found {
            return Err(Error::ChecksumInconsistency { expected, found });
        }
        Ok(())
    }
}

/// Start clockwise or stop the spindle.
pub fn build_power_frame(direction: Direction, policy: ChecksumPolicy) -> CommandFrame {
    CommandFrame::stamp([0x00, 0x00, direction.control_byte()], policy)
}

/// Set the output frequency for `target_rpm`.
pub fn build_speed_frame(target_rpm: u32, policy: ChecksumPolicy) -> CommandFrame {
    let [high, low] = rpm_to_deci_hz(target_rpm).to_be_bytes();
    CommandFrame::stamp([0x00, high, low], policy)
}

/// Frequency word for the drive. The division comes first, so the result is
/// always a multiple of 100 (the drive firmware truncates the same way).
/// Values past `u16::MAX` wrap.
pub fn rpm_to_deci_hz(target_rpm: u32) -> u16 {
    ((target_rpm / 60).wrapping_mul(100)) as u16
}
