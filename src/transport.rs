use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};

/// Byte stream to and from the drive.
pub trait Transport {
    /// Put all of `bytes` on the wire, in order.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// At least one received byte is waiting. Never blocks.
    fn readable(&mut self) -> io::Result<bool>;

    /// Wait up to `timeout` for one byte; `ErrorKind::TimedOut` otherwise.
    fn read_byte(&mut self, timeout: Duration) -> io::Result<u8>;
}

/// Transmit-enable line of the RS485 transceiver.
pub trait DirectionLine {
    fn assert_transmit(&mut self) -> io::Result<()>;
    fn deassert_transmit(&mut self) -> io::Result<()>;
}

impl<L: DirectionLine + ?Sized> DirectionLine for Box<L> {
    fn assert_transmit(&mut self) -> io::Result<()> {
        (**self).assert_transmit()
    }

    fn deassert_transmit(&mut self) -> io::Result<()> {
        (**self).deassert_transmit()
    }
}

pub trait Delay {
    fn delay_ms(&mut self, ms: u64);
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl SerialTransport {
    /// Open `path` with 8N1 framing.
    pub fn open(path: &str, baud: u32) -> io::Result<Self> {
        let timeout = Duration::from_secs(1);
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(timeout)
            .open()?;
        Ok(SerialTransport { port, timeout })
    }

    /// Direction line driven by the RTS pin of this same port, which is how
    /// most USB RS485 adapters wire DE/RE.
    pub fn rts_line(&self) -> io::Result<RtsLine> {
        Ok(RtsLine {
            port: self.port.try_clone()?,
        })
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn readable(&mut self) -> io::Result<bool> {
        Ok(self.port.bytes_to_read()? > 0)
    }

    fn read_byte(&mut self, timeout: Duration) -> io::Result<u8> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout)?;
            self.timeout = timeout;
        }

        let mut buf = [0u8; 1];
        loop {
            match self.port.read(&mut buf) {
                Ok(1) => return Ok(buf[0]),
                Ok(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial port returned no data",
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

pub struct RtsLine {
    port: Box<dyn SerialPort>,
}

impl DirectionLine for RtsLine {
    fn assert_transmit(&mut self) -> io::Result<()> {
        Ok(self.port.write_request_to_send(true)?)
    }

    fn deassert_transmit(&mut self) -> io::Result<()> {
        Ok(self.port.write_request_to_send(false)?)
    }
}

/// For transceivers that switch direction on their own.
pub struct AutoDirection;

impl DirectionLine for AutoDirection {
    fn assert_transmit(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn deassert_transmit(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Scripted collaborators sharing one event log.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Assert,
        Deassert,
        Delay(u64),
        Write(Vec<u8>),
        Readable(bool),
        Read(u8),
    }

    #[derive(Clone, Default)]
    pub struct Log(Arc<Mutex<Vec<Event>>>);

    impl Log {
        fn push(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }

        pub fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }
    }

    pub struct MockBus {
        log: Log,
        /// already received when the call starts
        pub buffered: VecDeque<u8>,
        /// only shows up once reads begin
        pub arriving: VecDeque<u8>,
        pub fail_writes: bool,
    }

    impl Transport for MockBus {
        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "line down"));
            }
            self.log.push(Event::Write(bytes.to_vec()));
            Ok(())
        }

        fn readable(&mut self) -> io::Result<bool> {
            let readable = !self.buffered.is_empty();
            self.log.push(Event::Readable(readable));
            Ok(readable)
        }

        fn read_byte(&mut self, _timeout: Duration) -> io::Result<u8> {
            let byte = match self.buffered.pop_front() {
                Some(byte) => byte,
                None => self.arriving.pop_front().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::TimedOut, "no byte in time")
                })?,
            };
            self.log.push(Event::Read(byte));
            Ok(byte)
        }
    }

    pub struct MockLine {
        log: Log,
    }

    impl DirectionLine for MockLine {
        fn assert_transmit(&mut self) -> io::Result<()> {
            self.log.push(Event::Assert);
            Ok(())
        }

        fn deassert_transmit(&mut self) -> io::Result<()> {
            self.log.push(Event::Deassert);
            Ok(())
        }
    }

    pub struct MockDelay {
        log: Log,
    }

    impl Delay for MockDelay {
        fn delay_ms(&mut self, ms: u64) {
            self.log.push(Event::Delay(ms));
        }
    }

    pub fn bench() -> (MockBus, MockLine, MockDelay, Log) {
        let log = Log::default();
        (
            MockBus {
                log: log.clone(),
                buffered: VecDeque::new(),
                arriving: VecDeque::new(),
                fail_writes: false,
            },
            MockLine { log: log.clone() },
            MockDelay { log: log.clone() },
            log,
        )
    }
}
