//! src/exchange/error.rs

use crate::session::TransferSession;
use std::fmt;
use std::io;
use thiserror::Error;

/// Which half of the duplex stream an error was observed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Transmit,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Transmit => write!(f, "TX"),
            Direction::Receive => write!(f, "RX"),
        }
    }
}

/// Everything that can end an exchange early.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /* ───────────── Pre-flight ───────────── */
    #[error("Invalid frame geometry: input {input} bytes, output {output} bytes")]
    InvalidGeometry { input: u64, output: u64 },

    #[error("Source length {total} is not a positive multiple of the {frame}-byte input frame")]
    InvalidFrameAlignment { total: u64, frame: u64 },

    /* ───────────── Frame level ───────────── */
    #[error("Source exhausted in frame {index}: got {got} of {expected} bytes")]
    ShortInputFrame { index: u64, got: usize, expected: usize },

    #[error("Peer closed in frame {index}: received {received} of {expected} bytes")]
    ShortOutputFrame { index: u64, received: usize, expected: usize },

    /* ───────────── Transport ───────────── */
    #[error("Transport closed while writing")]
    TransportClosed,

    #[error("{direction} operation timed out")]
    TransportTimeout { direction: Direction },

    #[error("Could not connect to {address}: {source}")]
    Connect { address: String, source: io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /* ───────────── Leaves ───────────── */
    #[error("Frame source failed: {0}")]
    Source(io::Error),

    #[error("Frame sink failed: {0}")]
    Sink(io::Error),

    /* ───────────── Control ───────────── */
    #[error("Exchange interrupted by operator")]
    InterruptedByOperator,

    #[error("{direction} task failed: {reason}")]
    TaskFailed { direction: Direction, reason: String },

    /// The receive task died and took the sink with it; the session still
    /// carries the counts.
    #[error("Receive task lost with its sink ({} of {} frames sent)", .session.frames_sent, .session.num_frames)]
    SinkLost { session: Box<TransferSession> },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ExchangeError {
    /// Maps a failed write onto the transport taxonomy.
    pub(crate) fn from_write(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WriteZero
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => ExchangeError::TransportClosed,
            io::ErrorKind::TimedOut => ExchangeError::TransportTimeout {
                direction: Direction::Transmit,
            },
            _ => ExchangeError::Io(e),
        }
    }

    /// Maps a failed read; a reset peer is reported as a plain I/O error
    /// because the frame index and byte count are not known here.
    pub(crate) fn from_read(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ExchangeError::TransportTimeout {
                direction: Direction::Receive,
            },
            _ => ExchangeError::Io(e),
        }
    }
}
