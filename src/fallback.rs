use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use eyre::Result;
use log::{debug, info};

use crate::Error;

pub type AttemptFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

type Attempt<'a, T> = Box<dyn FnOnce() -> AttemptFuture<'a, T> + Send + 'a>;

/// The value produced by the first attempt that succeeded
#[derive(Debug)]
pub struct Success<T> {
    pub attempt: String,
    pub value: T,
}

/// Ordered list of named attempts, evaluated one at a time until one succeeds.
///
/// Each attempt runs under its own timeout. A failed or timed-out attempt is
/// logged and the next one is started; nothing after the winner is started.
pub struct FallbackChain<'a, T> {
    timeout: Duration,
    attempts: Vec<(String, Attempt<'a, T>)>,
}

impl<'a, T: 'a> FallbackChain<'a, T> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            attempts: Vec::new(),
        }
    }

    pub fn attempt<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        self.push(name, f);
        self
    }

    pub fn push<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        let attempt: Attempt<'a, T> = Box::new(move || -> AttemptFuture<'a, T> { Box::pin(f()) });
        self.attempts.push((name.into(), attempt));
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub async fn run(self) -> Option<Success<T>> {
        let total = self.attempts.len();
        for (index, (name, attempt)) in self.attempts.into_iter().enumerate() {
            debug!("Attempt {}/{total}: {name}", index + 1);
            match tokio::time::timeout(self.timeout, attempt()).await {
                Ok(Ok(value)) => {
                    info!("Attempt '{name}' succeeded");
                    return Some(Success { attempt: name, value });
                }
                Ok(Err(e)) => {
                    let err = Error::CaptionFetch {
                        attempt: name,
                        reason: format!("{e:#}"),
                    };
                    debug!("{err}");
                }
                Err(_) => {
                    let err = Error::CaptionFetch {
                        attempt: name,
                        reason: format!("timed out after {:?}", self.timeout),
                    };
                    debug!("{err}");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use eyre::eyre;

    #[tokio::test]
    async fn test_first_success_wins() {
        let started = Arc::new(AtomicUsize::new(0));
        let s1 = started.clone();
        let s2 = started.clone();

        let result = FallbackChain::new(Duration::from_secs(1))
            .attempt("first", move || async move {
                s1.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .attempt("second", move || async move {
                s2.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .run()
            .await
            .unwrap();

        assert_eq!(result.attempt, "first");
        assert_eq!(result.value, 1);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_advances_to_next_attempt() {
        let result = FallbackChain::new(Duration::from_secs(1))
            .attempt("broken", || async { Err(eyre!("boom")) })
            .attempt("working", || async { Ok("text".to_string()) })
            .run()
            .await
            .unwrap();

        assert_eq!(result.attempt, "working");
        assert_eq!(result.value, "text");
    }

    #[tokio::test]
    async fn test_timeout_advances_to_next_attempt() {
        let result = FallbackChain::new(Duration::from_millis(20))
            .attempt("slow", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("late")
            })
            .attempt("fast", || async { Ok("on time") })
            .run()
            .await
            .unwrap();

        assert_eq!(result.attempt, "fast");
        assert_eq!(result.value, "on time");
    }

    #[tokio::test]
    async fn test_exhausted_chain_returns_none() {
        let chain: FallbackChain<'_, u32> = FallbackChain::new(Duration::from_secs(1))
            .attempt("a", || async { Err(eyre!("no")) })
            .attempt("b", || async { Err(eyre!("still no")) });
        assert_eq!(chain.len(), 2);
        assert!(chain.run().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_chain_returns_none() {
        let chain: FallbackChain<'_, u32> = FallbackChain::new(Duration::from_secs(1));
        assert!(chain.is_empty());
        assert!(chain.run().await.is_none());
    }
}
