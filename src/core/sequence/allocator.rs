//! Sequence allocator
//!
//! Every value comes from a single atomic increment-and-fetch on the counter
//! record, so concurrent callers in one process or many never receive the
//! same value. A missing counter is created once, seeded from the highest
//! custom id already stored for the kind.

use crate::adapters::database::traits::CounterStore;
use crate::config::{RetryConfig, SequenceConfig};
use crate::domain::errors::CredoError;
use crate::domain::ids::SequenceName;
use crate::domain::kind::EntityKind;
use crate::domain::Result;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Hands out unique, increasing custom ids per sequence
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
    retry: RetryConfig,
    bootstrap_from_existing: bool,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>, config: &SequenceConfig) -> Self {
        Self {
            store,
            retry: config.retry.clone(),
            bootstrap_from_existing: config.bootstrap_from_existing,
        }
    }

    /// Allocates the next value of `name`
    ///
    /// Retryable store failures are retried with exponential backoff. A value
    /// is returned only after the store confirmed the increment, and a failed
    /// attempt never hands one out.
    ///
    /// # Errors
    ///
    /// [`CredoError::Allocation`] once retries are exhausted or the store
    /// fails in a way retrying cannot fix.
    pub async fn next(&self, name: &SequenceName) -> Result<u64> {
        let mut attempt = 0;

        loop {
            match self.try_next(name).await {
                Ok(value) => {
                    tracing::debug!(sequence = %name, value, "Allocated sequence value");
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    crate::log_retry_attempt!(name, attempt, self.retry.max_retries, delay, e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    crate::log_error_with_context!(&e, "Sequence allocation failed");
                    return Err(match e {
                        CredoError::Allocation { .. } => e,
                        other => CredoError::Allocation {
                            sequence: name.clone(),
                            message: format!("{other} (after {attempt} retries)"),
                        },
                    });
                }
            }
        }
    }

    /// One increment, creating the counter first if it does not exist
    async fn try_next(&self, name: &SequenceName) -> Result<u64> {
        if let Some(value) = self.store.increment(name).await? {
            return Ok(value);
        }

        let floor = match EntityKind::for_sequence(name) {
            Some(kind) if self.bootstrap_from_existing => self.store.max_existing(kind).await?,
            _ => 0,
        };

        if self.store.seed(name, floor).await? {
            tracing::info!(sequence = %name, floor, "Created sequence counter");
        }

        self.store
            .increment(name)
            .await?
            .ok_or_else(|| CredoError::Allocation {
                sequence: name.clone(),
                message: "counter missing after seeding".to_string(),
            })
    }

    /// Backoff for `attempt` (1-based) with up to 25% random jitter, capped
    /// at the configured maximum
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = (self.retry.initial_delay_ms as f64
            * self.retry.backoff_multiplier.powi(exponent))
        .min(self.retry.max_delay_ms as f64) as u64;

        let jitter = if base >= 4 {
            rand::thread_rng().gen_range(0..=base / 4)
        } else {
            0
        };

        Duration::from_millis((base + jitter).min(self.retry.max_delay_ms))
    }

    /// Current value of `name` without allocating; `None` before first use
    pub async fn current(&self, name: &SequenceName) -> Result<Option<u64>> {
        self.store.current(name).await
    }

    /// Every counter and its current value
    pub async fn snapshot(&self) -> Result<Vec<(SequenceName, u64)>> {
        self.store.counters().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::errors::StoreError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config(max_retries: usize) -> SequenceConfig {
        SequenceConfig {
            bootstrap_from_existing: true,
            retry: RetryConfig {
                max_retries,
                initial_delay_ms: 1,
                max_delay_ms: 4,
                backoff_multiplier: 2.0,
            },
        }
    }

    fn name(value: &str) -> SequenceName {
        SequenceName::new(value).unwrap()
    }

    /// Fails the first `failures` increments with an unavailable store
    struct FlakyCounters {
        inner: MemoryStore,
        failures: AtomicUsize,
    }

    impl FlakyCounters {
        fn new(failures: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl CounterStore for FlakyCounters {
        async fn increment(&self, name: &SequenceName) -> Result<Option<u64>> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Unavailable("connection reset".to_string()).into());
            }
            self.inner.increment(name).await
        }

        async fn seed(&self, name: &SequenceName, value: u64) -> Result<bool> {
            self.inner.seed(name, value).await
        }

        async fn max_existing(&self, kind: EntityKind) -> Result<u64> {
            self.inner.max_existing(kind).await
        }

        async fn current(&self, name: &SequenceName) -> Result<Option<u64>> {
            self.inner.current(name).await
        }

        async fn counters(&self) -> Result<Vec<(SequenceName, u64)>> {
            self.inner.counters().await
        }
    }

    #[tokio::test]
    async fn test_first_value_is_one() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryStore::new()), &fast_config(0));
        assert_eq!(allocator.current(&name("user")).await.unwrap(), None);
        assert_eq!(allocator.next(&name("user")).await.unwrap(), 1);
        assert_eq!(allocator.next(&name("user")).await.unwrap(), 2);
        assert_eq!(allocator.current(&name("user")).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryStore::new()), &fast_config(0));
        allocator.next(&name("user")).await.unwrap();
        allocator.next(&name("user")).await.unwrap();
        assert_eq!(allocator.next(&name("payer")).await.unwrap(), 1);

        let snapshot = allocator.snapshot().await.unwrap();
        assert_eq!(snapshot, vec![(name("payer"), 1), (name("user"), 2)]);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(FlakyCounters::new(2));
        let allocator = SequenceAllocator::new(store, &fast_config(3));
        assert_eq!(allocator.next(&name("payer")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_allocation_error() {
        let store = Arc::new(FlakyCounters::new(10));
        let allocator = SequenceAllocator::new(store.clone(), &fast_config(2));

        let err = allocator.next(&name("payer")).await.unwrap_err();
        assert!(matches!(err, CredoError::Allocation { .. }));
        assert!(err.to_string().contains("payer"));

        // Nothing was handed out
        assert_eq!(store.current(&name("payer")).await.unwrap(), None);
    }

    #[test]
    fn test_backoff_is_capped() {
        let allocator = SequenceAllocator::new(
            Arc::new(MemoryStore::new()),
            &SequenceConfig {
                bootstrap_from_existing: true,
                retry: RetryConfig {
                    max_retries: 10,
                    initial_delay_ms: 100,
                    max_delay_ms: 1000,
                    backoff_multiplier: 2.0,
                },
            },
        );

        let first = allocator.backoff_delay(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        assert_eq!(allocator.backoff_delay(10), Duration::from_millis(1000));
    }
}
