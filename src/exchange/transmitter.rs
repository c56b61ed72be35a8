use super::cancel::{CancelOrigin, CancelSignal};
use super::error::{Direction, ExchangeError};
use crate::message::{DirectionReport, Termination};
use crate::source::FrameSource;
use crate::{duplex_debug, duplex_error, duplex_info, duplex_warn};
use humansize::{BINARY, format_size};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Outcome of pushing one frame onto the wire.
enum Sent {
    Frame,
    Cancelled,
}

/// Write direction: source frames → chunks → transport.
pub(crate) struct Transmitter<S, W> {
    pub source: S,
    pub writer: W,
    pub cancel: CancelSignal,
    pub num_frames: u64,
    pub frame_len: usize,
    pub max_chunk: usize,
    pub send_timeout: Duration,
}

impl<S, W> Transmitter<S, W>
where
    S: FrameSource,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub async fn run(mut self) -> DirectionReport {
        duplex_debug!("[TX] started, {} frames of {} B", self.num_frames, self.frame_len);

        let mut frames = 0u64;
        let mut bytes = 0u64;
        let termination = self.send_all(&mut frames, &mut bytes).await;

        match &termination {
            Termination::Failed(e) => duplex_error!("[TX] stopped after {} frames: {}", frames, e),
            Termination::Stopped => duplex_info!("[TX] cancelled after {} frames", frames),
            Termination::Completed => duplex_info!("[TX] all {} frames sent", frames),
        }

        self.half_close().await;
        DirectionReport::new(Direction::Transmit, frames, bytes, termination)
    }

    async fn send_all(&mut self, frames: &mut u64, bytes: &mut u64) -> Termination {
        for index in 0..self.num_frames {
            if self.cancel.is_cancelled() {
                return Termination::Stopped;
            }

            let frame = match self.source.next_frame(self.frame_len).await {
                Ok(Some(frame)) if frame.len() == self.frame_len => frame,
                Ok(short) => {
                    let got = short.map_or(0, |f| f.len());
                    // No cancel: the receiver still collects what already
                    // went out, but this stays the first fault.
                    self.cancel.record_fault(CancelOrigin::Transmitter);
                    self.cancel.limit_frames(index);
                    return Termination::Failed(ExchangeError::ShortInputFrame {
                        index,
                        got,
                        expected: self.frame_len,
                    });
                }
                Err(e) => return self.fail(ExchangeError::Source(e)),
            };

            match self.send_frame(&frame).await {
                Ok(Sent::Frame) => {}
                Ok(Sent::Cancelled) => return Termination::Stopped,
                Err(e) => return self.fail(e),
            }

            *frames += 1;
            *bytes += frame.len() as u64;
            duplex_debug!(
                "[TX] frame {}/{} total={}",
                index + 1,
                self.num_frames,
                format_size(*bytes, BINARY)
            );
        }
        Termination::Completed
    }

    /// Writes one frame in chunks of at most `max_chunk` bytes. Short writes
    /// are continued; nothing is ever retried.
    async fn send_frame(&mut self, frame: &[u8]) -> Result<Sent, ExchangeError> {
        for chunk in frame.chunks(self.max_chunk) {
            let mut offset = 0;
            while offset < chunk.len() {
                if self.cancel.is_cancelled() {
                    return Ok(Sent::Cancelled);
                }

                let written = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Ok(Sent::Cancelled),
                    res = timeout(self.send_timeout, self.writer.write(&chunk[offset..])) => res,
                };

                match written {
                    Ok(Ok(0)) => return Err(ExchangeError::TransportClosed),
                    Ok(Ok(n)) => offset += n,
                    Ok(Err(e)) => return Err(ExchangeError::from_write(e)),
                    Err(_) => {
                        return Err(ExchangeError::TransportTimeout {
                            direction: Direction::Transmit,
                        });
                    }
                }
            }
        }

        match timeout(self.send_timeout, self.writer.flush()).await {
            Ok(Ok(())) => Ok(Sent::Frame),
            Ok(Err(e)) => Err(ExchangeError::from_write(e)),
            Err(_) => Err(ExchangeError::TransportTimeout { direction: Direction::Transmit }),
        }
    }

    fn fail(&self, e: ExchangeError) -> Termination {
        self.cancel.trip(CancelOrigin::Transmitter);
        Termination::Failed(e)
    }

    /// Shuts down the write half only; the peer sees end of input while the
    /// receiver keeps reading.
    async fn half_close(&mut self) {
        match timeout(self.send_timeout, self.writer.shutdown()).await {
            Ok(Ok(())) => duplex_debug!("[TX] write half closed"),
            Ok(Err(e)) => duplex_warn!("[TX] half-close failed: {:?}", e),
            Err(_) => duplex_warn!("[TX] half-close timed out"),
        }
    }
}
