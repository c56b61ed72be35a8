use super::FrameSink;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Appends every frame to one binary file (`numFrames * outputFrameBytes`
/// bytes after a complete run).
pub struct BinaryFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    frames: u64,
    bytes: u64,
}

impl BinaryFileSink {
    /// Creates (or truncates) the file at `path`.
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            writer: BufWriter::with_capacity(1 << 20, file),
            frames: 0,
            bytes: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl FrameSink for BinaryFileSink {
    async fn on_output_frame(&mut self, _index: u64, frame: Bytes) -> io::Result<()> {
        self.writer.write_all(&frame).await?;
        self.frames += 1;
        self.bytes += frame.len() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await
    }
}
