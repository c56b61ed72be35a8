use crate::exchange::{Direction, ExchangeError};

/// How a direction loop ended.
#[derive(Debug)]
pub enum Termination {
    /// Every frame it was asked for went through.
    Completed,

    /// Saw the cancel signal (or the drain limit) and stopped before the
    /// next I/O call.
    Stopped,

    /// Hit a fault of its own.
    Failed(ExchangeError),
}

/// Sent once by each direction when its loop ends; the coordinator builds
/// the session from these and nothing else.
#[derive(Debug)]
pub struct DirectionReport {
    pub direction: Direction,
    pub frames: u64,
    pub bytes: u64,
    pub termination: Termination,
}

impl DirectionReport {
    pub fn new(direction: Direction, frames: u64, bytes: u64, termination: Termination) -> Self {
        Self { direction, frames, bytes, termination }
    }

    pub fn into_error(self) -> Option<ExchangeError> {
        match self.termination {
            Termination::Failed(e) => Some(e),
            _ => None,
        }
    }
}
