use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use tokio::sync::Notify;

/// Who detected the first fault of the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOrigin {
    Transmitter,
    Receiver,
    Operator,
}

impl CancelOrigin {
    fn to_raw(self) -> u8 {
        match self {
            CancelOrigin::Transmitter => 1,
            CancelOrigin::Receiver => 2,
            CancelOrigin::Operator => 3,
        }
    }

    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(CancelOrigin::Transmitter),
            2 => Some(CancelOrigin::Receiver),
            3 => Some(CancelOrigin::Operator),
            _ => None,
        }
    }
}

struct Inner {
    cancelled: AtomicBool,
    origin: AtomicU8,
    frame_limit: AtomicU64,
    notify: Notify,
}

/// Set-once cancellation shared by both directions of one exchange.
///
/// Besides the flag itself it carries a frame limit the transmitter lowers
/// when the source runs dry, so the receiver stops after the last frame that
/// actually went out. Neither value is ever reset.
#[derive(Clone)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                origin: AtomicU8::new(0),
                frame_limit: AtomicU64::new(u64::MAX),
                notify: Notify::new(),
            }),
        }
    }

    /// Operator-side cancellation, e.g. from a Ctrl-C handler.
    pub fn cancel(&self) -> bool {
        self.trip(CancelOrigin::Operator)
    }

    /// Sets the flag and records `origin` as the first fault unless one was
    /// recorded already. Returns `true` only for the caller that set the flag.
    pub fn trip(&self, origin: CancelOrigin) -> bool {
        self.record_fault(origin);
        let first = self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.inner.notify.notify_waiters();
        first
    }

    /// Records the first fault without cancelling, for faults the other
    /// direction should wind down from on its own. Set-once.
    pub fn record_fault(&self, origin: CancelOrigin) -> bool {
        self.inner
            .origin
            .compare_exchange(0, origin.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Origin of the first recorded fault, tripped or not.
    pub fn origin(&self) -> Option<CancelOrigin> {
        CancelOrigin::from_raw(self.inner.origin.load(Ordering::Acquire))
    }

    /// Lowers the number of frames the receiver should still collect.
    pub fn limit_frames(&self, frames: u64) {
        self.inner.frame_limit.fetch_min(frames, Ordering::AcqRel);
        self.inner.notify.notify_waiters();
    }

    #[inline]
    pub fn frame_limit(&self) -> u64 {
        self.inner.frame_limit.load(Ordering::Acquire)
    }

    /// Resolves once the signal is tripped.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Resolves once the signal is tripped or the frame limit drops to
    /// `index` or below. Used to wake a direction parked in a read or write.
    pub async fn stopped(&self, index: u64) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() || self.frame_limit() <= index {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_trip_wins() {
        let signal = CancelSignal::new();
        assert!(signal.trip(CancelOrigin::Receiver));
        assert!(!signal.trip(CancelOrigin::Transmitter));
        assert!(!signal.cancel());
        assert_eq!(signal.origin(), Some(CancelOrigin::Receiver));
        assert!(signal.is_cancelled());
    }

    #[test]
    fn recorded_fault_outranks_later_trip() {
        let signal = CancelSignal::new();
        assert!(signal.record_fault(CancelOrigin::Transmitter));
        assert!(!signal.is_cancelled());
        assert!(signal.trip(CancelOrigin::Receiver));
        assert!(signal.is_cancelled());
        assert_eq!(signal.origin(), Some(CancelOrigin::Transmitter));
    }

    #[test]
    fn frame_limit_only_goes_down() {
        let signal = CancelSignal::new();
        signal.limit_frames(5);
        signal.limit_frames(9);
        assert_eq!(signal.frame_limit(), 5);
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn stopped_wakes_parked_waiter() {
        let signal = CancelSignal::new();
        let waiter = {
            let s = signal.clone();
            tokio::spawn(async move { s.stopped(0).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not woken")
            .unwrap();
    }
}
