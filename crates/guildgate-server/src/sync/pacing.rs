//! Pacing between consecutive platform calls in replay and sweep loops.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Waits before the next call in a sequential loop.
pub trait Pacer: Send + Sync {
    fn pause(&self) -> impl Future<Output = ()> + Send;
}

/// Sleeps for a fixed duration. A zero duration never yields to the timer.
#[derive(Debug, Clone, Copy)]
pub struct FixedPacer {
    delay: Duration,
}

impl FixedPacer {
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

impl Pacer for FixedPacer {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl<P: Pacer> Pacer for Arc<P> {
    fn pause(&self) -> impl Future<Output = ()> + Send {
        P::pause(self)
    }
}
