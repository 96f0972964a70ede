// Request deduplicator - one in-flight call per key, minimum spacing between calls
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(1000);

type SharedCall<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Inner<T, E> {
    in_flight: HashMap<String, SharedCall<T, E>>,
    completed_at: HashMap<String, Instant>,
}

/// Collapses concurrent identical upstream calls into one and spaces out
/// repeated calls sharing a key.
///
/// Results and errors are cloned to every caller that joined the call, so
/// both must be `Clone`. The call itself runs on a spawned task: a caller
/// that stops waiting does not cancel it for the others. A panicking call
/// still releases its key; the panic resumes in the callers that joined it.
pub struct RequestDeduplicator<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    min_delay: Duration,
}

impl<T, E> Clone for RequestDeduplicator<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            min_delay: self.min_delay,
        }
    }
}

impl<T, E> Default for RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY)
    }
}

impl<T, E> RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(min_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                in_flight: HashMap::new(),
                completed_at: HashMap::new(),
            })),
            min_delay,
        }
    }

    /// Runs `operation` under `key` with the configured minimum delay.
    pub async fn execute<F, Fut>(&self, key: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.execute_with_delay(key, self.min_delay, operation).await
    }

    pub async fn execute_with_delay<F, Fut>(
        &self,
        key: &str,
        min_delay: Duration,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        // Lookup and registration happen under one lock acquisition.
        let call = {
            let mut inner = self.inner.lock();
            if let Some(pending) = inner.in_flight.get(key) {
                tracing::debug!("Joining in-flight request {}", key);
                pending.clone()
            } else {
                let not_before = inner.completed_at.get(key).map(|last| *last + min_delay);
                let call = self.start(key.to_string(), not_before, operation);
                inner.in_flight.insert(key.to_string(), call.clone());
                call
            }
        };

        call.await
    }

    fn start<F, Fut>(&self, key: String, not_before: Option<Instant>, operation: F) -> SharedCall<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let inner = self.inner.clone();
        let call = async move {
            if let Some(deadline) = not_before {
                if deadline > Instant::now() {
                    tracing::debug!("Delaying request {} to respect minimum spacing", key);
                    tokio::time::sleep_until(deadline).await;
                }
            }

            let outcome = AssertUnwindSafe(async move { operation().await })
                .catch_unwind()
                .await;

            {
                let mut inner = inner.lock();
                inner.in_flight.remove(&key);
                inner.completed_at.insert(key, Instant::now());
            }

            match outcome {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        .boxed()
        .shared();

        tokio::spawn(call.clone());
        call
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.inner.lock().in_flight.len()
    }
}
