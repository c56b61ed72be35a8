use crate::exchange::ExchangeError;
use serde::Deserialize;

/// Byte sizes of one input and one output frame, agreed out of band with the
/// device. There is no header on the wire, so these are the only frame
/// boundaries either side knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct FrameGeometry {
    pub input_frame_bytes: u64,
    pub output_frame_bytes: u64,
}

impl FrameGeometry {
    pub fn new(input_frame_bytes: u64, output_frame_bytes: u64) -> Self {
        Self { input_frame_bytes, output_frame_bytes }
    }

    /// Geometry from image dimensions: `width * height * bytes_per_pixel`.
    pub fn from_pixels(
        input: (u64, u64, u64),
        output: (u64, u64, u64),
    ) -> Self {
        Self::new(input.0 * input.1 * input.2, output.0 * output.1 * output.2)
    }

    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.input_frame_bytes == 0 || self.output_frame_bytes == 0 {
            return Err(ExchangeError::InvalidGeometry {
                input: self.input_frame_bytes,
                output: self.output_frame_bytes,
            });
        }
        Ok(())
    }

    /// Number of frames in a source of `total_bytes`.
    pub fn frame_count(&self, total_bytes: u64) -> Result<u64, ExchangeError> {
        self.validate()?;
        if total_bytes == 0 || total_bytes % self.input_frame_bytes != 0 {
            return Err(ExchangeError::InvalidFrameAlignment {
                total: total_bytes,
                frame: self.input_frame_bytes,
            });
        }
        Ok(total_bytes / self.input_frame_bytes)
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.input_frame_bytes as usize
    }

    #[inline]
    pub fn output_len(&self) -> usize {
        self.output_frame_bytes as usize
    }

    /// Total bytes the device is expected to send back for `frames` frames.
    pub fn expected_output(&self, frames: u64) -> u64 {
        frames * self.output_frame_bytes
    }
}

impl Default for FrameGeometry {
    /// 320x180 BGR24 in, 1280x720 ABGR32 out.
    fn default() -> Self {
        Self::from_pixels((320, 180, 3), (1280, 720, 4))
    }
}
