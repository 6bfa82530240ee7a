//! Grokipedia API access
//!
//! Calls go through a [`RequestExecutor`], which retries transient failures
//! and classifies every outcome into an [`ApiError`] with an exit code.

pub mod client;
pub mod error;
pub mod executor;
pub mod models;
pub mod retry;

pub use client::{decode, ApiCall, ApiClient};
pub use error::{ApiError, ExitCode};
pub use executor::{AttemptOutcome, RequestDescriptor, RequestExecutor};
pub use retry::{
    FixedJitter, JitterSource, RandomJitter, RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper,
    MAX_ATTEMPTS,
};
