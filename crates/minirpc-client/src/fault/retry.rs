//! Retry strategies.
//!
//! A strategy wraps the transport call after discovery and selection have
//! already happened; attempts re-enter the operation fresh but never re-run
//! discovery. Terminal failure surfaces as
//! [`RpcError::RetryExhausted`](minirpc_common::RpcError::RetryExhausted) for
//! the tolerance layer.

use async_trait::async_trait;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::RpcResponse;
use minirpc_common::spi::SpiRegistry;

/// One unit of retryable work. Every invocation produces a fresh attempt.
pub type RetryOperation = dyn Fn() -> BoxFuture<'static, RpcResult<RpcResponse>> + Send + Sync;

#[async_trait]
pub trait RetryStrategy: Send + Sync {
    async fn do_retry(&self, operation: &RetryOperation) -> RpcResult<RpcResponse>;
}

/// Single attempt; errors pass through untouched.
pub struct NoRetryStrategy;

#[async_trait]
impl RetryStrategy for NoRetryStrategy {
    async fn do_retry(&self, operation: &RetryOperation) -> RpcResult<RpcResponse> {
        operation().await
    }
}

/// Attempts made by [`FixedIntervalRetryStrategy`].
pub const MAX_ATTEMPTS: u32 = 3;

/// Wait between attempts of [`FixedIntervalRetryStrategy`].
pub const RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Up to 3 attempts with a fixed 3-second wait in between, retrying on any
/// error.
pub struct FixedIntervalRetryStrategy;

#[async_trait]
impl RetryStrategy for FixedIntervalRetryStrategy {
    async fn do_retry(&self, operation: &RetryOperation) -> RpcResult<RpcResponse> {
        let mut last_error: Option<RpcError> = None;
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                info!(attempt, max_attempts = MAX_ATTEMPTS, "retrying call");
            }
            match operation().await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    warn!(attempt, %err, "attempt failed");
                    last_error = Some(err);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_INTERVAL).await;
                    }
                }
            }
        }
        Err(RpcError::RetryExhausted {
            attempts: MAX_ATTEMPTS,
            last: last_error.map(|err| err.to_string()).unwrap_or_default(),
        })
    }
}

/// Interface identifier used by descriptor files.
pub const RETRY_INTERFACE: &str = "minirpc.fault.retry.RetryStrategy";

static RETRY_STRATEGIES: Lazy<SpiRegistry<dyn RetryStrategy>> = Lazy::new(|| {
    SpiRegistry::new(
        RETRY_INTERFACE,
        include_str!("../../resources/spi/system/minirpc.fault.retry.RetryStrategy"),
        &[
            ("minirpc.fault.retry.NoRetryStrategy", || {
                Arc::new(NoRetryStrategy) as Arc<dyn RetryStrategy>
            }),
            ("minirpc.fault.retry.FixedIntervalRetryStrategy", || {
                Arc::new(FixedIntervalRetryStrategy) as Arc<dyn RetryStrategy>
            }),
        ],
    )
});

/// Resolves a retry strategy by configuration name.
pub fn for_name(name: &str) -> RpcResult<Arc<dyn RetryStrategy>> {
    RETRY_STRATEGIES.get(name)
}

/// Applies user descriptor overrides for the retry interface.
pub fn load_custom_descriptors(dir: &Path) {
    RETRY_STRATEGIES.load_custom_dir(dir);
}

#[cfg(test)]
mod tests {
    use super::*;
    use minirpc_common::protocol::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn always_failing(counter: Arc<AtomicU32>) -> impl Fn() -> BoxFuture<'static, RpcResult<RpcResponse>> + Send + Sync
    {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RpcError::Connection("connection refused".to_string()))
            })
        }
    }

    fn failing_until(counter: Arc<AtomicU32>, succeed_on: u32) -> impl Fn() -> BoxFuture<'static, RpcResult<RpcResponse>> + Send + Sync
    {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt >= succeed_on {
                    Ok(RpcResponse::ok(Value::I64(attempt as i64), "i64"))
                } else {
                    Err(RpcError::Timeout(100))
                }
            })
        }
    }

    #[tokio::test]
    async fn test_no_retry_single_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let operation = always_failing(counter.clone());
        let err = NoRetryStrategy.do_retry(&operation).await.unwrap_err();
        assert!(matches!(err, RpcError::Connection(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_exhausts_after_three_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let operation = always_failing(counter.clone());

        let started = tokio::time::Instant::now();
        let err = FixedIntervalRetryStrategy
            .do_retry(&operation)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RpcError::RetryExhausted { attempts: 3, .. }
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // two 3-second waits between three attempts
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_stops_on_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let operation = failing_until(counter.clone(), 2);

        let response = FixedIntervalRetryStrategy.do_retry(&operation).await.unwrap();
        assert_eq!(response.data, Some(Value::I64(2)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_attempt_success_is_immediate() {
        let counter = Arc::new(AtomicU32::new(0));
        let operation = failing_until(counter.clone(), 1);
        let response = FixedIntervalRetryStrategy.do_retry(&operation).await.unwrap();
        assert_eq!(response.data, Some(Value::I64(1)));
    }

    #[test]
    fn test_spi_resolution() {
        assert!(for_name("no").is_ok());
        assert!(for_name("fixedInterval").is_ok());
        assert!(for_name("exponential").is_err());
    }
}
