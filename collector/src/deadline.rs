use crate::CollectError;
use std::{
    future::Future,
    time::Duration,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Time budget of one collection plus the run's cancellation signal.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
    cancel: CancellationToken,
}

impl Deadline {
    pub fn new(budget: Duration, cancel: CancellationToken) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
            cancel,
        }
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drives `fut` until it finishes, the deadline passes or the run is canceled, whichever
    /// comes first. Losing futures are dropped, which kills any child process they own.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, CollectError>
    where
        F: Future<Output = Result<T, CollectError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CollectError::Canceled),
            _ = tokio::time::sleep_until(self.at) => Err(CollectError::timeout(self.budget)),
            result = fut => result,
        }
    }
}
