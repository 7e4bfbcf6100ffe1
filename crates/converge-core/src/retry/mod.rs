//! Retry classification and the bounded retry driver
//!
//! - [`RetryClassifier`]: transient-vs-permanent classification by message content
//! - [`RetryPolicy`] / [`retry_until`]: deadline-bounded backoff loop

pub mod classifier;
pub mod driver;

pub use classifier::{Classification, RetryClassifier, DEFAULT_TRANSIENT_SIGNATURES};
pub use driver::{retry_until, RetryPolicy};
