//! Run-state synchronisation between the execution backend and CI checks.
//!
//! A check-suite event resolves into run specifications, each specification
//! is submitted to the execution backend, and one watcher per launched run
//! keeps the author-visible CI check in step with the backend's state. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
