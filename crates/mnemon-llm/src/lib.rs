//! # mnemon-llm
//!
//! Error classification and timed retry for model calls.
//!
//! Provider clients map their failures into [`LlmError`] and wrap each call in
//! [`retry_with_policy`], with a [`RetryPolicy`] built from the `retry`
//! settings section.

#![deny(unsafe_code)]

pub mod errors;
pub mod retry;

pub use errors::LlmError;
pub use retry::{RetryPolicy, retry_with_policy};
