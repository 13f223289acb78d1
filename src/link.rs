use std::io;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::frame::CommandFrame;
use crate::status::{STATUS_FRAME_LEN, StatusCheck, StatusFrame};
use crate::transport::{Delay, DirectionLine, Transport};

pub const DEFAULT_BAUD: u32 = 9600;

/// Bus timing. Defaults are the A131 requirements at 9600 8N1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub baud: u32,
    /// start + 8 data + stop
    pub bits_per_byte: u32,
    /// transceiver switch time after asserting the transmit line
    pub settle_ms: u64,
    /// bus idle time required after every command
    pub guard_ms: u64,
    /// upper bound for receiving a whole status frame
    pub read_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            baud: DEFAULT_BAUD,
            bits_per_byte: 10,
            settle_ms: 1,
            guard_ms: 50,
            read_timeout: Duration::from_secs(1),
        }
    }
}

impl Timing {
    /// Time for `len` bytes to leave the UART, rounded up to whole ms.
    pub fn drain_ms(&self, len: usize) -> u64 {
        let bits = len as u64 * self.bits_per_byte as u64 * 1000;
        bits.div_ceil(self.baud.max(1) as u64)
    }
}

/// One RS485 bus with its direction line and clock.
///
/// `send` and `read_status` each take `&mut self` for their whole duration,
/// so a caller holding the link cannot interleave two bus sequences.
pub struct HalfDuplex<T, L, D> {
    transport: T,
    line: L,
    delay: D,
    timing: Timing,
}

impl<T: Transport, L: DirectionLine, D: Delay> HalfDuplex<T, L, D> {
    pub fn new(transport: T, line: L, delay: D, timing: Timing) -> Self {
        HalfDuplex {
            transport,
            line,
            delay,
            timing,
        }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Transmit `frame`, then hand the bus back to the drive.
    pub fn send(&mut self, frame: &CommandFrame) -> Result<()> {
        if let Err(e) = frame.verify() {
            warn!("sending frame with stale trailer: {e}");
        }
        debug!("tx {:02X?}", frame.as_bytes());

        self.line.assert_transmit()?;
        self.delay.delay_ms(self.timing.settle_ms);

        let written = self.transport.write_all(frame.as_bytes());
        if written.is_ok() {
            self.delay.delay_ms(self.timing.drain_ms(frame.len()));
        }
        // release the bus even when the write failed
        self.line.deassert_transmit()?;
        written?;

        self.delay.delay_ms(self.timing.guard_ms);
        Ok(())
    }

    /// Drop whatever is buffered, then block for the next complete status
    /// frame, at most `timing.read_timeout`.
    pub fn read_status(&mut self, check: StatusCheck) -> Result<StatusFrame> {
        let mut dropped = 0usize;
        while self.transport.readable()? {
            self.transport.read_byte(self.timing.read_timeout)?;
            dropped += 1;
        }
        if dropped > 0 {
            debug!("dropped {dropped} stale bytes");
        }

        let deadline = Instant::now() + self.timing.read_timeout;
        let mut bytes = [0u8; STATUS_FRAME_LEN];
        for (received, slot) in bytes.iter_mut().enumerate() {
            let timeout = Error::ResponseTimeout {
                received,
                expected: STATUS_FRAME_LEN,
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timeout);
            }
            *slot = match self.transport.read_byte(remaining) {
                Ok(byte) => byte,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(timeout),
                Err(e) => return Err(e.into()),
            };
        }

        let frame = StatusFrame::from_bytes(bytes);
        debug!("rx {:02X?}", frame.as_bytes());
        if check == StatusCheck::Strict {
            frame.validate()?;
        }
        Ok(frame)
    }
}
