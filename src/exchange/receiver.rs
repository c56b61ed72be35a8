use super::cancel::{CancelOrigin, CancelSignal};
use super::error::{Direction, ExchangeError};
use crate::message::{DirectionReport, Termination};
use crate::sink::FrameSink;
use crate::{duplex_debug, duplex_error, duplex_info};
use bytes::{Bytes, BytesMut};
use humansize::{BINARY, format_size};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

/// Read direction: transport → reassembled frames → sink.
pub(crate) struct Receiver<K, R> {
    pub sink: K,
    pub reader: R,
    pub cancel: CancelSignal,
    pub num_frames: u64,
    pub frame_len: usize,
    pub recv_timeout: Duration,
}

impl<K, R> Receiver<K, R>
where
    K: FrameSink,
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Runs the loop and hands the sink back once it has been finished.
    pub async fn run(mut self) -> (DirectionReport, K) {
        duplex_debug!("[RX] started, {} frames of {} B", self.num_frames, self.frame_len);

        let mut frames = 0u64;
        let mut bytes = 0u64;
        let mut termination = self.receive_all(&mut frames, &mut bytes).await;

        // Frames already handed over stay persisted whatever happened above.
        if let Err(e) = self.sink.finish().await {
            if !matches!(termination, Termination::Failed(_)) {
                termination = self.fail(ExchangeError::Sink(e));
            } else {
                duplex_error!("[RX] sink finish failed after an earlier fault: {}", e);
            }
        }

        match &termination {
            Termination::Failed(e) => duplex_error!("[RX] stopped after {} frames: {}", frames, e),
            Termination::Stopped => duplex_info!("[RX] stopped after {} frames", frames),
            Termination::Completed => duplex_info!("[RX] all {} frames received", frames),
        }

        (DirectionReport::new(Direction::Receive, frames, bytes, termination), self.sink)
    }

    async fn receive_all(&mut self, frames: &mut u64, bytes: &mut u64) -> Termination {
        for index in 0..self.num_frames {
            let frame = match self.receive_frame(index).await {
                Ok(Some(frame)) => frame,
                Ok(None) => return Termination::Stopped,
                Err(e) => return self.fail(e),
            };

            let len = frame.len() as u64;
            if let Err(e) = self.sink.on_output_frame(index, frame).await {
                return self.fail(ExchangeError::Sink(e));
            }

            *frames += 1;
            *bytes += len;
            duplex_debug!(
                "[RX] frame {}/{} total={}",
                index + 1,
                self.num_frames,
                format_size(*bytes, BINARY)
            );
        }
        Termination::Completed
    }

    /// Fills one output frame from however many reads it takes. `Ok(None)`
    /// means the exchange was stopped; the partial buffer is dropped.
    async fn receive_frame(&mut self, index: u64) -> Result<Option<Bytes>, ExchangeError> {
        let mut buf = BytesMut::zeroed(self.frame_len);
        let mut received = 0;

        while received < self.frame_len {
            if self.should_stop(index) {
                return Ok(None);
            }

            let read = tokio::select! {
                biased;
                _ = self.cancel.stopped(index) => return Ok(None),
                res = timeout(self.recv_timeout, self.reader.read(&mut buf[received..])) => res,
            };

            match read {
                Ok(Ok(0)) => {
                    return Err(ExchangeError::ShortOutputFrame {
                        index,
                        received,
                        expected: self.frame_len,
                    });
                }
                Ok(Ok(n)) => received += n,
                Ok(Err(e)) => return Err(ExchangeError::from_read(e)),
                Err(_) => {
                    return Err(ExchangeError::TransportTimeout {
                        direction: Direction::Receive,
                    });
                }
            }
        }

        Ok(Some(buf.freeze()))
    }

    #[inline]
    fn should_stop(&self, index: u64) -> bool {
        self.cancel.is_cancelled() || index >= self.cancel.frame_limit()
    }

    fn fail(&self, e: ExchangeError) -> Termination {
        self.cancel.trip(CancelOrigin::Receiver);
        Termination::Failed(e)
    }
}
