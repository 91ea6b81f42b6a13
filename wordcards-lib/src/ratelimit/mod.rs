//! Coordinated handling of rate limiting by the retrieval source.
//!
//! Rate limiting is a property of the source, not of a single word. When
//! several retrievals are throttled at the same time, one of them becomes the
//! leader and probes the source until it recovers. All others wait for the
//! leader and then retry once.
//!
//! # Architecture
//!
//! - [`BackoffCoordinator`]: Owns the shared [`BackoffState`] and runs the retry protocol
//! - [`Role`]: What a throttled retrieval has to do, lead or follow
//! - [`LeaderGuard`]: Releases all followers when the leader is done, also on cancellation
//! - [`BackoffConfig`]: Probe interval

mod config;
mod coordinator;

pub use config::BackoffConfig;
pub use coordinator::{BackoffCoordinator, BackoffState, LeaderGuard, Role};
