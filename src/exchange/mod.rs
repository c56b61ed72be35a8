mod cancel;
mod coordinator;
mod error;
mod receiver;
mod transmitter;

pub use cancel::{CancelOrigin, CancelSignal};
pub use coordinator::{ExchangeCoordinator, TransferOutcome};
pub use error::{Direction, ExchangeError};
