//! Input side leaves: where the raw frames come from.

use bytes::{Bytes, BytesMut};
use std::future::Future;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Ordered, finite supply of input frames.
pub trait FrameSource: Send + 'static {
    /// Declared length of the whole source, used for the pre-flight
    /// alignment check.
    fn total_bytes(&self) -> u64;

    /// Next frame of `frame_len` bytes.
    ///
    /// `Ok(None)` means the source is exhausted. A returned frame shorter
    /// than `frame_len` means it ran dry mid-frame.
    fn next_frame(
        &mut self,
        frame_len: usize,
    ) -> impl Future<Output = io::Result<Option<Bytes>>> + Send;
}

/* ----------------------------------------------------------------
   Reader-backed source (raw stream files)
---------------------------------------------------------------- */
pub struct ReaderSource<R> {
    reader: R,
    total: u64,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, total: u64) -> Self {
        Self { reader, total }
    }
}

impl ReaderSource<File> {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path).await?;
        let total = file.metadata().await?.len();
        Ok(Self::new(file, total))
    }
}

impl<R> FrameSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn total_bytes(&self) -> u64 {
        self.total
    }

    async fn next_frame(&mut self, frame_len: usize) -> io::Result<Option<Bytes>> {
        let mut frame = BytesMut::zeroed(frame_len);
        let mut filled = 0;

        // A file read may stop short of the request without being at EOF.
        while filled < frame_len {
            let n = self.reader.read(&mut frame[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        frame.truncate(filled);
        Ok(Some(frame.freeze()))
    }
}

/* ----------------------------------------------------------------
   In-memory source (generators, tests)
---------------------------------------------------------------- */
pub struct MemorySource {
    data: Bytes,
    offset: usize,
    declared: u64,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let declared = data.len() as u64;
        Self { data, offset: 0, declared }
    }

    /// Claims a different length than the data actually holds, e.g. a file
    /// truncated after its size was read.
    pub fn with_declared_len(mut self, declared: u64) -> Self {
        self.declared = declared;
        self
    }
}

impl FrameSource for MemorySource {
    fn total_bytes(&self) -> u64 {
        self.declared
    }

    async fn next_frame(&mut self, frame_len: usize) -> io::Result<Option<Bytes>> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = (self.offset + frame_len).min(self.data.len());
        let frame = self.data.slice(self.offset..end);
        self.offset = end;
        Ok(Some(frame))
    }
}
