pub mod config;
pub mod duplex_log;
pub mod exchange;
pub mod geometry;
pub mod loopback;
pub mod message;
pub mod session;
pub mod sink;
pub mod source;
pub mod transport;

/* Re-exports */
pub use config::{ExchangeConfig, HarnessConfig, TransportConfig};
pub use exchange::{CancelOrigin, CancelSignal, Direction, ExchangeCoordinator, ExchangeError, TransferOutcome};
pub use geometry::FrameGeometry;
pub use session::TransferSession;
pub use sink::{BinaryFileSink, FrameSink, HexDumpSink, HexLayout, MemorySink};
pub use source::{FrameSource, MemorySource, ReaderSource};
