use crate::exchange::ExchangeError;
use std::time::Duration;
use uuid::Uuid;

/// Final bookkeeping of one exchange. Built by the coordinator after both
/// directions have reported, never touched afterwards.
#[derive(Debug)]
pub struct TransferSession {
    pub id: Uuid,
    pub num_frames: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Set when the exchange stopped early: the signal was tripped, or a
    /// short input frame cut the run down to the frames already sent. A
    /// trip after both directions completed does not count.
    pub cancelled: bool,
    pub failure: Option<ExchangeError>,
    pub elapsed: Duration,
}

impl TransferSession {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
            && self.frames_sent == self.num_frames
            && self.frames_received == self.num_frames
    }

    /// Fails with the recorded reason, if any.
    pub fn into_result(mut self) -> Result<Self, ExchangeError> {
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}
