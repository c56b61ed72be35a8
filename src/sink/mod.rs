//! Output side leaves: where received frames end up.

mod binary;
mod hex_dump;
mod memory;

pub use binary::BinaryFileSink;
pub use hex_dump::{HexDumpSink, HexLayout, render_hex_rows};
pub use memory::MemorySink;

use bytes::Bytes;
use std::future::Future;
use std::io;

/// Consumer of completed output frames.
///
/// `on_output_frame` is called exactly once per fully received frame, in
/// increasing index order. `finish` is called once after the last frame or
/// after a failure, so whatever arrived before the fault is kept.
pub trait FrameSink: Send + 'static {
    fn on_output_frame(
        &mut self,
        index: u64,
        frame: Bytes,
    ) -> impl Future<Output = io::Result<()>> + Send;

    fn finish(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        async { Ok(()) }
    }
}
