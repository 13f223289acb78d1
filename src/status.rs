//! Status frame the drive broadcasts on its own, several times a second.
//!
//! Layout (13 bytes):
//! [0]     0x00
//! [1]     0x55
//! [2..7)  D1..D5, digits of the panel display, D1 most significant
//! [7]     D6, indicator LEDs
//! [8]     0x01
//! [9]     0x00
//! [10]    XOR of [1..10)
//! [11]    ADD, sum of [1..10) plus XOR
//! [12]    0xFF

use crate::checksum::Checksum;
use crate::error::{Error, Result};

pub const STATUS_FRAME_LEN: usize = 13;

const FIXED_BYTES: [(usize, u8); 5] = [(0, 0x00), (1, 0x55), (8, 0x01), (9, 0x00), (12, 0xFF)];

/// How much a received status frame is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCheck {
    /// fixed bytes, digit range and trailer must all be right
    #[default]
    Strict,
    /// decode whatever arrived
    Lenient,
}

/// D6 indicator byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicators(u8);

impl Indicators {
    pub fn bits(self) -> u8 {
        self.0
    }

    fn bit(self, n: u8) -> bool {
        self.0 & (1 << n) != 0
    }

    pub fn fault(self) -> bool {
        self.bit(0)
    }

    pub fn clockwise(self) -> bool {
        self.bit(1)
    }

    pub fn anticlockwise(self) -> bool {
        self.bit(2)
    }

    pub fn analog_input(self) -> bool {
        self.bit(3)
    }

    pub fn multi_segment(self) -> bool {
        self.bit(4)
    }

    pub fn panel(self) -> bool {
        self.bit(5)
    }

    pub fn external_signal(self) -> bool {
        self.bit(6)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFrame {
    bytes: [u8; STATUS_FRAME_LEN],
}

impl StatusFrame {
    pub fn from_bytes(bytes: [u8; STATUS_FRAME_LEN]) -> Self {
        StatusFrame { bytes }
    }

    /// Well-formed frame showing `digits` with indicator byte `d6`, as the
    /// drive would send it.
    pub fn encode(digits: [u8; 5], d6: u8) -> Self {
        let mut bytes = [0u8; STATUS_FRAME_LEN];
        for (index, value) in FIXED_BYTES {
            bytes[index] = value;
        }
        bytes[2..7].copy_from_slice(&digits);
        bytes[7] = d6;
        let trailer = Checksum::over(&bytes[1..10]).to_bytes();
        bytes[10..12].copy_from_slice(&trailer);
        StatusFrame { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; STATUS_FRAME_LEN] {
        &self.bytes
    }

    /// D1..D5
    pub fn digits(&self) -> [u8; 5] {
        [
            self.bytes[2],
            self.bytes[3],
            self.bytes[4],
            self.bytes[5],
            self.bytes[6],
        ]
    }

    pub fn indicators(&self) -> Indicators {
        Indicators(self.bytes[7])
    }

    pub fn validate(&self) -> Result<()> {
        for (index, value) in FIXED_BYTES {
            if self.bytes[index] != value {
                return Err(Error::ProtocolFraming(format!(
                    "byte {} is 0x{:02X}, expected 0x{:02X}",
                    index + 1,
                    self.bytes[index],
                    value
                )));
            }
        }

        if let Some(digit) = self.digits().iter().find(|&&d| d > 9) {
            return Err(Error::ProtocolFraming(format!(
                "display digit 0x{digit:02X} out of range"
            )));
        }

        let expected = Checksum::over(&self.bytes[1..10]);
        if expected.to_bytes() != [self.bytes[10], self.bytes[11]] {
            return Err(Error::ProtocolFraming(format!(
                "trailer {:02X} {:02X}, expected {:02X} {:02X}",
                self.bytes[10], self.bytes[11], expected.xor, expected.add
            )));
        }

        Ok(())
    }

    /// Display value weighted D1*100 + D2*10 + D3 + D4/10 + D5/100, the
    /// fractional digits included before truncating to an integer.
    pub fn frequency_raw(&self) -> u32 {
        let [d1, d2, d3, d4, d5] = self.digits().map(u32::from);
        // hundredths, so the sub-integer digits are exact
        let centi = d1 * 10_000 + d2 * 1_000 + d3 * 100 + d4 * 10 + d5;
        centi / 100
    }

    /// Spindle speed, dividing before multiplying like [`crate::frame::rpm_to_deci_hz`].
    pub fn rpm(&self) -> u32 {
        self.frequency_raw() / 100 * 60
    }
}
