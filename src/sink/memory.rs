use super::FrameSink;
use bytes::Bytes;
use std::io;

/// Keeps frames in memory, mostly for tests and small captures.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<(u64, Bytes)>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[(u64, Bytes)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// All frames concatenated in arrival order.
    pub fn concat(&self) -> Vec<u8> {
        let len = self.frames.iter().map(|(_, f)| f.len()).sum();
        let mut out = Vec::with_capacity(len);
        for (_, frame) in &self.frames {
            out.extend_from_slice(frame);
        }
        out
    }
}

impl FrameSink for MemorySink {
    async fn on_output_frame(&mut self, index: u64, frame: Bytes) -> io::Result<()> {
        self.frames.push((index, frame));
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}
