//! Bounded retry with exponential backoff

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use ruleset_core::LookupSettings;

use crate::error::RequestError;

/// How often, and how patiently, a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Upper bound for any single wait, `Retry-After` included
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&LookupSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &LookupSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: settings.initial_backoff(),
            max_backoff: settings.max_backoff(),
        }
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(0.2)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only [`RequestError::Transient`] is retried; the last transient error
    /// is returned once `max_attempts` is reached.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RequestError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, RequestError>> + Send,
        T: Send,
    {
        let attempts = AtomicU32::new(0);
        let max_attempts = self.max_attempts;
        let max_backoff = self.max_backoff;

        backoff::future::retry(self.schedule(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let request = op();
            async move {
                match request.await {
                    Ok(value) => Ok(value),
                    Err(RequestError::Transient {
                        reason,
                        retry_after,
                    }) if attempt < max_attempts => {
                        tracing::debug!(what, attempt, %reason, "transient failure, retrying");
                        let error = RequestError::Transient {
                            reason,
                            retry_after,
                        };
                        Err(match retry_after {
                            Some(wait) => backoff::Error::retry_after(error, wait.min(max_backoff)),
                            None => backoff::Error::transient(error),
                        })
                    }
                    Err(error) => {
                        if error.is_transient() {
                            tracing::warn!(what, attempt, %error, "giving up after retries");
                        }
                        Err(backoff::Error::permanent(error))
                    }
                }
            }
        })
        .await
    }
}
