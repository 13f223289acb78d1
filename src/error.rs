use thiserror::Error;

/// error raised while talking to the drive
#[derive(Error, Debug)]
pub enum Error {
    #[error("problem with the serial bus: {0}")]
    Transport(#[from] std::io::Error),
    #[error("status frame incomplete: got {received} of {expected} bytes in time")]
    ResponseTimeout { received: usize, expected: usize },
    #[error("malformed status frame: {0}")]
    ProtocolFraming(String),
    #[error("frame trailer 0x{found:04X} does not match payload checksum 0x{expected:04X}")]
    ChecksumInconsistency { expected: u16, found: u16 },
}

pub type Result<T> = std::result::Result<T, Error>;
