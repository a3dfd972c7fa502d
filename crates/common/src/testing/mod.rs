//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: polling helpers for background work such as the
//!   task scheduler and the analytics flush chain
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use intelligence_common::testing::poll_until;
//!
//! # async fn demo(queue_len: impl Fn() -> usize) {
//! # let queue_len = &queue_len;
//! let drained = poll_until(Duration::from_secs(1), Duration::from_millis(10), || async move {
//!     queue_len() == 0
//! })
//! .await;
//! assert!(drained);
//! # }
//! ```

pub mod async_utils;

pub use async_utils::{poll_until, timeout_ok};
