//! Failure classification and retry
//!
//! This module provides:
//! - Error categorization into transient/permanent with suggested fixes
//! - Exponential-backoff retry driven by that categorization

mod categorize;
mod retry;

pub use categorize::{
    categorize_error, is_transient_error, Categorize, ErrorCategory, ErrorInfo, ErrorType,
};
pub use retry::{retry_with_backoff, RetryPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES};
