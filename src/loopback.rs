//! A software stand-in for the board: reads whole input frames, maps each
//! one to an output frame, writes it back. Lets the harness be exercised on
//! a desktop without the hardware.

use crate::geometry::FrameGeometry;
use crate::{duplex_debug, duplex_error, duplex_info, duplex_warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

/// Turns input frame `index` into its output frame.
pub type FrameProcessor = Arc<dyn Fn(u64, &[u8]) -> Vec<u8> + Send + Sync>;

/// Sends each frame back unchanged (input and output sizes must match).
pub fn echo() -> FrameProcessor {
    Arc::new(|_: u64, input: &[u8]| input.to_vec())
}

/// Repeats the input bytes until `output_len` bytes are filled.
pub fn tile(output_len: usize) -> FrameProcessor {
    Arc::new(move |_: u64, input: &[u8]| input.iter().copied().cycle().take(output_len).collect())
}

pub struct LoopbackDevice {
    listener: TcpListener,
    geometry: FrameGeometry,
    processor: FrameProcessor,
    no_delay: bool,
}

impl LoopbackDevice {
    pub async fn bind(
        address: &str,
        geometry: FrameGeometry,
        processor: FrameProcessor,
    ) -> io::Result<Self> {
        geometry
            .validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        let listener = TcpListener::bind(address).await?;
        duplex_info!("Loopback device listening on {}", listener.local_addr()?);
        Ok(Self { listener, geometry, processor, no_delay: true })
    }

    pub fn with_no_delay(mut self, no_delay: bool) -> Self {
        self.no_delay = no_delay;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts one connection and serves it to the end. Returns the number
    /// of frames answered.
    pub async fn serve_one(&self) -> io::Result<u64> {
        let (socket, peer) = self.listener.accept().await?;
        duplex_debug!("Accepted connection from {}", peer);
        if let Err(e) = socket.set_nodelay(self.no_delay) {
            duplex_warn!("Failed to set TCP_NODELAY: {:?}", e);
        }
        serve_stream(socket, self.geometry, self.processor.clone()).await
    }

    /// Serves connections one after another, like the board's single-client
    /// firmware. Only returns if accepting fails.
    pub async fn run(self) -> io::Result<()> {
        loop {
            match self.serve_one().await {
                Ok(frames) => duplex_info!("Client done after {} frames", frames),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    duplex_warn!("Client left mid-frame: {}", e)
                }
                Err(e) if is_accept_fatal(&e) => return Err(e),
                Err(e) => duplex_error!("Client session failed: {:?}", e),
            }
        }
    }
}

fn is_accept_fatal(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::AddrNotAvailable | io::ErrorKind::PermissionDenied)
}

/// Device loop over any duplex stream. Ends cleanly when the peer
/// half-closes on a frame boundary; a close mid-frame is `UnexpectedEof`.
pub async fn serve_stream<T>(
    stream: T,
    geometry: FrameGeometry,
    processor: FrameProcessor,
) -> io::Result<u64>
where
    T: AsyncRead + AsyncWrite + Send,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut input = vec![0u8; geometry.input_len()];
    let mut frames = 0u64;

    loop {
        let mut filled = 0;
        while filled < input.len() {
            let n = reader.read(&mut input[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            writer.shutdown().await?;
            return Ok(frames);
        }
        if filled < input.len() {
            let _ = writer.shutdown().await;
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("input frame {frames}: {filled} of {} bytes", input.len()),
            ));
        }

        let output = processor(frames, &input[..]);
        if output.len() != geometry.output_len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("processor produced {} bytes, expected {}", output.len(), geometry.output_len()),
            ));
        }
        writer.write_all(&output).await?;
        writer.flush().await?;
        frames += 1;
        duplex_debug!("Loopback answered frame {}", frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_fills_output() {
        let out = tile(7)(0, &[1u8, 2, 3][..]);
        assert_eq!(out, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[tokio::test]
    async fn serves_until_half_close() {
        let (mut harness, device) = tokio::io::duplex(64);
        let geometry = FrameGeometry::new(4, 8);
        let task = tokio::spawn(serve_stream(device, geometry, tile(8)));

        harness.write_all(&[1, 2, 3, 4, 5, 6, 7, 8]).await.unwrap();
        harness.shutdown().await.unwrap();

        let mut back = Vec::new();
        harness.read_to_end(&mut back).await.unwrap();
        assert_eq!(back, vec![1, 2, 3, 4, 1, 2, 3, 4, 5, 6, 7, 8, 5, 6, 7, 8]);
        assert_eq!(task.await.unwrap().unwrap(), 2);
    }
}
