//! Injectable suspension point between RPC round trips.

use async_trait::async_trait;
use std::time::Duration;

/// Trait for the sleeps inside the polling and retry loops -- allows testing
/// the full state machine without wall-clock delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records requested delays without waiting.
    #[derive(Default)]
    pub(crate) struct NoDelay {
        pub slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for NoDelay {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }
}
