use super::FrameSink;
use crate::duplex_debug;
use bytes::Bytes;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

/// How an output frame is cut into text rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HexLayout {
    pub row_pixels: usize,
    pub bytes_per_pixel: usize,
}

impl HexLayout {
    pub fn new(row_pixels: usize, bytes_per_pixel: usize) -> Self {
        Self {
            row_pixels: row_pixels.max(1),
            bytes_per_pixel: bytes_per_pixel.max(1),
        }
    }

    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_pixels * self.bytes_per_pixel
    }
}

impl Default for HexLayout {
    /// 1280 px wide ABGR32 rows.
    fn default() -> Self {
        Self::new(1280, 4)
    }
}

/// One line per pixel row; each pixel is its bytes as uppercase two-digit
/// hex, pixels separated by a single space.
pub fn render_hex_rows(frame: &[u8], layout: HexLayout) -> String {
    // 2 hex chars per byte, 1 separator per pixel
    let per_pixel = layout.bytes_per_pixel * 2 + 1;
    let mut out = String::with_capacity(frame.len() / layout.bytes_per_pixel * per_pixel + 1);

    for row in frame.chunks(layout.row_bytes()) {
        for (i, pixel) in row.chunks(layout.bytes_per_pixel).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            for b in pixel {
                let _ = write!(out, "{b:02X}");
            }
        }
        out.push('\n');
    }
    out
}

/// Decorator that additionally writes the first `limit` frames as text to
/// `dir/frame_NNNNNN.txt` before handing them on.
pub struct HexDumpSink<S> {
    inner: S,
    dir: PathBuf,
    limit: u64,
    layout: HexLayout,
}

impl<S: FrameSink> HexDumpSink<S> {
    pub fn new(inner: S, dir: impl AsRef<Path>, limit: u64, layout: HexLayout) -> Self {
        Self {
            inner,
            dir: dir.as_ref().to_path_buf(),
            limit,
            layout,
        }
    }

    pub fn dump_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.txt"))
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: FrameSink> FrameSink for HexDumpSink<S> {
    async fn on_output_frame(&mut self, index: u64, frame: Bytes) -> io::Result<()> {
        if index < self.limit {
            let path = self.dump_path(index);
            let text = render_hex_rows(&frame, self.layout);
            tokio::fs::write(&path, text).await?;
            duplex_debug!("Hex dump of frame {} written to {}", index, path.display());
        }
        self.inner.on_output_frame(index, frame).await
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.inner.finish().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rows_of_pixel_groups() {
        let frame = [0x00, 0x0A, 0xFF, 0x10, 0x01, 0x02, 0x03, 0x04];
        let text = render_hex_rows(&frame, HexLayout::new(1, 4));
        assert_eq!(text, "000AFF10\n01020304\n");
    }

    #[test]
    fn pixels_in_a_row_are_space_separated() {
        let frame = [0xAB, 0xCD, 0x01, 0x02, 0x03, 0x04];
        let text = render_hex_rows(&frame, HexLayout::new(3, 2));
        assert_eq!(text, "ABCD 0102 0304\n");
    }

    #[test]
    fn single_byte_pixels() {
        let text = render_hex_rows(&[1, 2, 3, 4], HexLayout::new(2, 1));
        assert_eq!(text, "01 02\n03 04\n");
    }
}
