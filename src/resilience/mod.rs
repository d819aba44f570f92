//! Resilience primitives shared by publish retries and the reconciler.

pub mod backoff;

pub use backoff::{delay_for_attempt, Backoff};
