use super::cancel::{CancelOrigin, CancelSignal};
use super::error::{Direction, ExchangeError};
use super::receiver::Receiver;
use super::transmitter::Transmitter;
use crate::config::ExchangeConfig;
use crate::message::{DirectionReport, Termination};
use crate::session::TransferSession;
use crate::sink::FrameSink;
use crate::source::FrameSource;
use crate::{duplex_error, duplex_info};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinError;
use uuid::Uuid;

/// What a finished exchange gives back: the session and the sink, which
/// moved into the receive task for the duration of the run.
#[derive(Debug)]
pub struct TransferOutcome<K> {
    pub session: TransferSession,
    pub sink: K,
}

/// Runs one exchange: one transmit task, one receive task, one shared
/// cancel signal. Consumed by `run`, so a tripped signal never leaks into a
/// later exchange.
pub struct ExchangeCoordinator {
    cfg: ExchangeConfig,
    cancel: CancelSignal,
}

impl ExchangeCoordinator {
    pub fn new(cfg: ExchangeConfig) -> Self {
        Self { cfg, cancel: CancelSignal::new() }
    }

    /// Handle for cancelling from outside (operator interrupt).
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.cfg
    }

    /// Pre-flight check; needs no connection. Returns the frame count.
    pub fn plan(&self, total_bytes: u64) -> Result<u64, ExchangeError> {
        self.cfg.validate()?;
        self.cfg.geometry().frame_count(total_bytes)
    }

    /// Runs the exchange over one full-duplex stream.
    pub async fn run<S, K, T>(
        self,
        source: S,
        sink: K,
        stream: T,
    ) -> Result<TransferOutcome<K>, ExchangeError>
    where
        S: FrameSource,
        K: FrameSink,
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let num_frames = self.plan(source.total_bytes())?;
        let (reader, writer) = tokio::io::split(stream);
        self.launch(num_frames, source, sink, reader, writer).await
    }

    /// Same as [`run`](Self::run) for a stream that is already split, e.g.
    /// `TcpStream::into_split`.
    pub async fn run_split<S, K, R, W>(
        self,
        source: S,
        sink: K,
        reader: R,
        writer: W,
    ) -> Result<TransferOutcome<K>, ExchangeError>
    where
        S: FrameSource,
        K: FrameSink,
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let num_frames = self.plan(source.total_bytes())?;
        self.launch(num_frames, source, sink, reader, writer).await
    }

    async fn launch<S, K, R, W>(
        self,
        num_frames: u64,
        source: S,
        sink: K,
        reader: R,
        writer: W,
    ) -> Result<TransferOutcome<K>, ExchangeError>
    where
        S: FrameSource,
        K: FrameSink,
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let id = Uuid::new_v4();
        let geometry = self.cfg.geometry();
        let started = Instant::now();
        duplex_info!(
            "Exchange {} started: {} frames, {} B out / {} B back per frame",
            id,
            num_frames,
            geometry.input_frame_bytes,
            geometry.output_frame_bytes
        );

        // ---------------- Write direction ------------------------------
        let tx_jh = tokio::spawn(
            Transmitter {
                source,
                writer,
                cancel: self.cancel.clone(),
                num_frames,
                frame_len: geometry.input_len(),
                max_chunk: self.cfg.max_chunk_bytes(),
                send_timeout: self.cfg.send_timeout(),
            }
            .run(),
        );

        // ---------------- Read direction -------------------------------
        let rx_jh = tokio::spawn(
            Receiver {
                sink,
                reader,
                cancel: self.cancel.clone(),
                num_frames,
                frame_len: geometry.output_len(),
                recv_timeout: self.cfg.recv_timeout(),
            }
            .run(),
        );

        // No deadline here: each direction is bounded by its own I/O timeouts.
        let tx_res = tx_jh.await;
        if let Err(e) = &tx_res {
            duplex_error!("Exchange {}: transmit task died: {}", id, e);
            self.cancel.trip(CancelOrigin::Transmitter);
        }

        let (rx, sink) = match rx_jh.await {
            Ok(done) => done,
            Err(e) => {
                duplex_error!("Exchange {}: receive task died: {}", id, e);
                self.cancel.trip(CancelOrigin::Receiver);
                let rx = panicked(Direction::Receive, 0, 0, &e);
                let tx = tx_res.unwrap_or_else(|e| panicked(Direction::Transmit, 0, 0, &e));
                let session = self.finalize(id, num_frames, tx, rx, started);
                return Err(ExchangeError::SinkLost { session: Box::new(session) });
            }
        };

        // Every frame that came back went out, so that is the floor for a
        // transmitter that left no report.
        let tx = tx_res.unwrap_or_else(|e| {
            panicked(Direction::Transmit, rx.frames, rx.frames * geometry.input_frame_bytes, &e)
        });

        let session = self.finalize(id, num_frames, tx, rx, started);
        match &session.failure {
            None => duplex_info!(
                "Exchange {} finished: {}/{} frames in {:?}",
                id,
                session.frames_received,
                num_frames,
                session.elapsed
            ),
            Some(e) => duplex_error!(
                "Exchange {} failed: {} (sent {}/{}, received {}/{})",
                id,
                e,
                session.frames_sent,
                num_frames,
                session.frames_received,
                num_frames
            ),
        }

        Ok(TransferOutcome { session, sink })
    }

    /// Folds the two termination reports into the session. The failure
    /// reported is the one from whoever recorded the first fault.
    fn finalize(
        &self,
        id: Uuid,
        num_frames: u64,
        tx: DirectionReport,
        rx: DirectionReport,
        started: Instant,
    ) -> TransferSession {
        let (frames_sent, bytes_sent) = (tx.frames, tx.bytes);
        let (frames_received, bytes_received) = (rx.frames, rx.bytes);
        // An interrupt that lands after both loops finished cut nothing short.
        let both_completed = matches!(tx.termination, Termination::Completed)
            && matches!(rx.termination, Termination::Completed);
        let tx_err = tx.into_error();
        let rx_err = rx.into_error();

        let failure = match self.cancel.origin() {
            Some(CancelOrigin::Operator) if both_completed => None,
            Some(CancelOrigin::Operator) => Some(ExchangeError::InterruptedByOperator),
            Some(CancelOrigin::Receiver) => rx_err.or(tx_err),
            Some(CancelOrigin::Transmitter) | None => tx_err.or(rx_err),
        };

        TransferSession {
            id,
            num_frames,
            frames_sent,
            frames_received,
            bytes_sent,
            bytes_received,
            cancelled: !both_completed
                && (self.cancel.is_cancelled() || self.cancel.frame_limit() < num_frames),
            failure,
            elapsed: started.elapsed(),
        }
    }
}

/// Stand-in report for a direction task that panicked.
fn panicked(direction: Direction, frames: u64, bytes: u64, e: &JoinError) -> DirectionReport {
    let failure = ExchangeError::TaskFailed { direction, reason: e.to_string() };
    DirectionReport::new(direction, frames, bytes, Termination::Failed(failure))
}
