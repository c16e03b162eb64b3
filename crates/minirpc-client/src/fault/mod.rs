//! Fault handling around the transport call: retry first, tolerance last.

pub mod retry;
pub mod tolerant;

pub use retry::{FixedIntervalRetryStrategy, NoRetryStrategy, RetryOperation, RetryStrategy};
pub use tolerant::{
    FailBackTolerantStrategy, FailFastTolerantStrategy, FailOverTolerantStrategy,
    FailSafeTolerantStrategy, ToleranceContext, TolerantStrategy,
};
